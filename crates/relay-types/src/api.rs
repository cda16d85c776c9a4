use serde::{Deserialize, Serialize};

// -- Messages --

/// Body of `POST /messages`. Missing fields decode as empty and are
/// rejected by the handler, so both failures read the same to a client.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PostMessageRequest {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostMessageResponse {
    pub id: i64,
    /// Formatted as `YYYY-MM-DDTHH:MM:SSZ`.
    pub ts: String,
}

/// Raw query string of `GET /messages`. Values stay strings so the
/// handler can report which parameter failed to parse.
#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    #[serde(rename = "for")]
    pub for_entity: Option<String>,
    pub since: Option<String>,
    pub limit: Option<String>,
    pub all: Option<String>,
}
