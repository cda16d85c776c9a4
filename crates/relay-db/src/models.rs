/// Database row types. These map directly to SQLite rows and are converted
/// into `relay-types` models at the edge of the store.
use relay_types::{Message, Presence};
use tracing::warn;

use crate::timestamp::parse_timestamp;

pub struct MessageRow {
    pub id: i64,
    pub ts: String,
    pub sender: String,
    pub body: String,
    pub mentions: String,
}

impl MessageRow {
    pub fn into_message(self) -> Message {
        let mentions = serde_json::from_str::<Option<Vec<String>>>(&self.mentions)
            .unwrap_or_else(|e| {
                warn!("Corrupt mentions '{}' on message {}: {}", self.mentions, self.id, e);
                None
            })
            .unwrap_or_default();

        Message {
            id: self.id,
            timestamp: parse_timestamp(&self.ts),
            sender: self.sender,
            body: self.body,
            mentions,
        }
    }
}

pub struct PresenceRow {
    pub name: String,
    pub last_seen: String,
}

impl PresenceRow {
    pub fn into_presence(self) -> Presence {
        Presence {
            last_seen: parse_timestamp(&self.last_seen),
            name: self.name,
        }
    }
}
