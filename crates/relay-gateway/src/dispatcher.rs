use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use relay_types::Message;

/// Pending messages a live subscriber may fall behind by before new ones
/// are dropped for it.
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 10;

pub type SubscriberId = u64;

/// Fans new messages out to every connected stream subscriber.
///
/// Delivery is best-effort: `broadcast` never waits on a subscriber, and a
/// message that finds a full queue is dropped for that subscriber only.
/// Pollers read the durable log and never miss anything.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// subscriber_id -> queue sender. Write lock for (un)registration,
    /// read lock for broadcast.
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<Arc<Message>>>>,
    next_id: AtomicU64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. Dropping the returned handle unregisters it.
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);

        let count = {
            let mut subscribers = self
                .inner
                .subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.insert(id, tx);
            subscribers.len()
        };
        debug!(subscriber = id, total = count, "Stream subscriber registered");

        Subscription {
            id,
            rx,
            dispatcher: self.clone(),
        }
    }

    /// Remove a subscriber and close its queue. Returns false if it was
    /// already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();

        if removed {
            debug!(subscriber = id, "Stream subscriber unregistered");
        }
        removed
    }

    /// Offer `message` to every subscriber without blocking. Returns the
    /// number of queues that accepted it.
    pub fn broadcast(&self, message: Message) -> usize {
        let message = Arc::new(message);
        let subscribers = self
            .inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let mut delivered = 0;
        for (id, tx) in subscribers.iter() {
            match tx.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(subscriber = id, message = message.id, "Subscriber queue full, dropping");
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    /// Unregister everyone. Open streams finish once their queues drain.
    pub fn close_all(&self) {
        let closed = {
            let mut subscribers = self
                .inner
                .subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let n = subscribers.len();
            subscribers.clear();
            n
        };
        debug!(closed, "All stream subscribers closed");
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A registered stream subscriber's queue.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Arc<Message>>,
    dispatcher: Dispatcher,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next message in FIFO order. `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<Arc<Message>> {
        self.rx.recv().await
    }

    /// Non-waiting variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<Arc<Message>> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispatcher.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn message(id: i64) -> Message {
        Message {
            id,
            timestamp: Utc::now(),
            sender: "alice".into(),
            body: format!("message {id}"),
            mentions: vec![],
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let dispatcher = Dispatcher::new();
        let mut a = dispatcher.subscribe();
        let mut b = dispatcher.subscribe();

        assert_eq!(dispatcher.broadcast(message(1)), 2);

        assert_eq!(a.recv().await.unwrap().id, 1);
        assert_eq!(b.recv().await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn unsubscribed_subscriber_receives_nothing() {
        let dispatcher = Dispatcher::new();
        let mut a = dispatcher.subscribe();
        let b = dispatcher.subscribe();

        assert!(dispatcher.unsubscribe(b.id()));
        assert_eq!(dispatcher.broadcast(message(1)), 1);
        assert_eq!(a.recv().await.unwrap().id, 1);

        assert!(!dispatcher.unsubscribe(b.id()));
    }

    #[tokio::test]
    async fn unsubscribe_closes_queue() {
        let dispatcher = Dispatcher::new();
        let mut sub = dispatcher.subscribe();
        dispatcher.broadcast(message(1));
        dispatcher.unsubscribe(sub.id());

        // Already-queued messages drain, then the queue reports closed.
        assert_eq!(sub.recv().await.unwrap().id, 1);
        assert!(sub.recv().await.is_none());
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let dispatcher = Dispatcher::new();
        let sub = dispatcher.subscribe();
        assert_eq!(dispatcher.subscriber_count(), 1);
        drop(sub);
        assert_eq!(dispatcher.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn close_all_ends_every_subscription() {
        let dispatcher = Dispatcher::new();
        let mut a = dispatcher.subscribe();
        let mut b = dispatcher.subscribe();

        dispatcher.close_all();
        assert_eq!(dispatcher.subscriber_count(), 0);
        assert!(a.recv().await.is_none());
        assert!(b.recv().await.is_none());
        assert_eq!(dispatcher.broadcast(message(1)), 0);
    }

    #[tokio::test]
    async fn full_queue_drops_for_slow_subscriber_only() {
        let dispatcher = Dispatcher::new();
        let mut slow = dispatcher.subscribe();
        let mut fast = dispatcher.subscribe();

        for id in 1..=SUBSCRIBER_QUEUE_CAPACITY as i64 {
            dispatcher.broadcast(message(id));
            assert_eq!(fast.recv().await.unwrap().id, id);
        }

        // `slow` is at capacity; this one only reaches `fast`.
        let overflow = SUBSCRIBER_QUEUE_CAPACITY as i64 + 1;
        assert_eq!(dispatcher.broadcast(message(overflow)), 1);
        assert_eq!(fast.recv().await.unwrap().id, overflow);

        let mut seen = Vec::new();
        while let Some(msg) = slow.try_recv() {
            seen.push(msg.id);
        }
        let expected: Vec<i64> = (1..=SUBSCRIBER_QUEUE_CAPACITY as i64).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn per_subscriber_order_is_fifo() {
        let dispatcher = Dispatcher::new();
        let mut sub = dispatcher.subscribe();
        for id in 1..=5 {
            dispatcher.broadcast(message(id));
        }
        for id in 1..=5 {
            assert_eq!(sub.recv().await.unwrap().id, id);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_subscribe_unsubscribe_and_broadcast() {
        let dispatcher = Dispatcher::new();
        let mut tasks = Vec::new();

        for _ in 0..8 {
            let d = dispatcher.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..100 {
                    let mut sub = d.subscribe();
                    tokio::task::yield_now().await;
                    let _ = sub.try_recv();
                }
            }));
        }
        for worker in 0..4 {
            let d = dispatcher.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..200 {
                    d.broadcast(message(worker * 1000 + i));
                    tokio::task::yield_now().await;
                }
            }));
        }

        let all = async {
            for task in tasks {
                task.await.unwrap();
            }
        };
        tokio::time::timeout(Duration::from_secs(10), all)
            .await
            .expect("no deadlock");
        assert_eq!(dispatcher.subscriber_count(), 0);
    }
}
