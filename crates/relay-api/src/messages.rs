use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

use relay_types::api::{MessagesQuery, PostMessageRequest, PostMessageResponse};
use relay_types::{Message, parse_mentions};

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// Which store query a `GET /messages` request maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadMode {
    /// `for=<entity>` without `all=true`.
    ForEntity { entity: String, since: i64 },
    /// Positive `limit` and no entity filter.
    Recent { limit: u32 },
    /// Everything after the `since` watermark.
    Since { since: i64 },
}

impl ReadMode {
    /// Select the read mode and the entity whose presence the read refreshes.
    pub fn from_query(query: &MessagesQuery) -> Result<(Self, Option<String>), ApiError> {
        let since = parse_param(query.since.as_deref(), "since")?;
        let limit = parse_param(query.limit.as_deref(), "limit")?;
        let all = query.all.as_deref() == Some("true");
        let entity = query.for_entity.clone().filter(|e| !e.is_empty());

        let mode = match &entity {
            Some(entity) if !all => Self::ForEntity {
                entity: entity.clone(),
                since,
            },
            _ if limit > 0 => Self::Recent {
                limit: u32::try_from(limit).unwrap_or(u32::MAX),
            },
            _ => Self::Since { since },
        };

        Ok((mode, entity))
    }
}

fn parse_param(value: Option<&str>, name: &str) -> Result<i64, ApiError> {
    match value {
        None | Some("") => Ok(0),
        Some(v) => v
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("invalid '{name}' parameter"))),
    }
}

/// POST /messages
pub async fn send_message(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: PostMessageRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON: {e}")))?;

    if req.from.is_empty() {
        return Err(ApiError::BadRequest("missing 'from' field".into()));
    }
    if req.body.is_empty() {
        return Err(ApiError::BadRequest("missing 'body' field".into()));
    }

    let mentions = parse_mentions(&req.body).tokens();

    let db = state.clone();
    let message = run_blocking(move || {
        let message = db.db.insert_message(&req.from, &req.body, &mentions)?;
        if let Err(e) = db.db.update_presence(&req.from) {
            warn!("Failed to refresh presence for {}: {:#}", req.from, e);
        }
        Ok(message)
    })
    .await?;

    info!(
        id = message.id,
        from = %message.sender,
        mentions = message.mentions.len(),
        "Message posted"
    );

    let response = PostMessageResponse {
        id: message.id,
        ts: message.timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    };

    state.dispatcher.broadcast(message);

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /messages?for=&since=&limit=&all=
pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let (mode, reader) = ReadMode::from_query(&query)?;

    let db = state.clone();
    let messages = run_blocking(move || {
        let messages = match mode {
            ReadMode::ForEntity { entity, since } => db.db.get_messages_for_entity(&entity, since),
            ReadMode::Recent { limit } => db.db.get_recent_messages(limit),
            ReadMode::Since { since } => db.db.get_messages_since(since),
        };

        // A poll on someone's behalf counts as activity, even with all=true.
        if let Some(name) = reader {
            if let Err(e) = db.db.update_presence(&name) {
                warn!("Failed to refresh presence for {}: {:#}", name, e);
            }
        }

        messages
    })
    .await?;

    Ok(Json(messages))
}

/// DELETE /messages
pub async fn clear_messages(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    let db = state.clone();
    run_blocking(move || db.db.clear_messages()).await?;

    info!("Message log cleared");
    Ok(StatusCode::NO_CONTENT)
}
