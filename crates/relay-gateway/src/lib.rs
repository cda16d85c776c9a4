pub mod dispatcher;

pub use dispatcher::{Dispatcher, SUBSCRIBER_QUEUE_CAPACITY, SubscriberId, Subscription};
