use axum::{Json, extract::State};

use relay_types::Presence;

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// GET /presence: everyone active within the configured window.
pub async fn get_presence(State(state): State<AppState>) -> Result<Json<Vec<Presence>>, ApiError> {
    let db = state.clone();
    let presence = run_blocking(move || db.db.get_presence(db.presence_minutes)).await?;
    Ok(Json(presence))
}
