use std::convert::Infallible;

use axum::{
    extract::State,
    http::header,
    response::{
        IntoResponse,
        sse::{Event, Sse},
    },
};
use futures_util::Stream;
use tracing::{debug, warn};

use relay_gateway::Subscription;

use crate::state::AppState;

/// GET /stream: Server-Sent Events feed of newly posted messages.
///
/// The subscriber is registered before the response starts, so nothing
/// posted after this handler runs is missed except by queue overflow.
pub async fn stream(State(state): State<AppState>) -> impl IntoResponse {
    let subscription = state.dispatcher.subscribe();
    debug!(subscriber = subscription.id(), "Stream opened");

    (
        [
            (header::CONNECTION, "keep-alive"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        Sse::new(events(subscription)),
    )
}

/// Comment line first, then one `data:` event per message. Ends when the
/// subscription closes; dropping the stream (client gone) unregisters it.
fn events(mut subscription: Subscription) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        yield Ok(Event::default().comment("connected"));

        while let Some(message) = subscription.recv().await {
            match Event::default().json_data(&*message) {
                Ok(event) => yield Ok(event),
                Err(e) => warn!("Failed to encode message {} for stream: {}", message.id, e),
            }
        }

        debug!(subscriber = subscription.id(), "Stream closed");
    }
}
