pub mod error;
pub mod messages;
pub mod presence;
pub mod state;
pub mod stream;
pub mod ui;

use axum::{Router, routing::get};

pub use error::ApiError;
pub use state::{AppState, AppStateInner, DEFAULT_PRESENCE_MINUTES};

/// All relay routes. Transport layers (CORS, tracing) are added by the caller.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ui::index))
        .route(
            "/messages",
            get(messages::get_messages)
                .post(messages::send_message)
                .delete(messages::clear_messages),
        )
        .route("/stream", get(stream::stream))
        .route("/presence", get(presence::get_presence))
        .with_state(state)
}
