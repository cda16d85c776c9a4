use std::sync::Arc;

use relay_db::Database;
use relay_gateway::Dispatcher;
use tracing::error;

use crate::error::ApiError;

/// Presence window used when none is configured.
pub const DEFAULT_PRESENCE_MINUTES: f64 = 30.0;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub dispatcher: Dispatcher,
    pub presence_minutes: f64,
}

impl AppStateInner {
    pub fn new(db: Database, presence_minutes: f64) -> AppState {
        Arc::new(Self {
            db,
            dispatcher: Dispatcher::new(),
            presence_minutes,
        })
    }
}

/// Run blocking store work off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal("internal error".into())
        })?
        .map_err(ApiError::Store)
}
