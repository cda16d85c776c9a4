use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A relayed message. Immutable once the store has assigned `id` and `ts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "from")]
    pub sender: String,
    pub body: String,
    /// Lowercase mention tokens, including `all`/`here` when present.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<String>,
}

/// Last recorded activity for a sender or polling recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub name: String,
    pub last_seen: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(mentions: Vec<String>) -> Message {
        Message {
            id: 7,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            sender: "alice".into(),
            body: "hello @bob".into(),
            mentions,
        }
    }

    #[test]
    fn message_uses_wire_field_names() {
        let json = serde_json::to_value(sample(vec!["bob".into()])).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["ts"], "2024-01-02T03:04:05Z");
        assert_eq!(json["from"], "alice");
        assert_eq!(json["body"], "hello @bob");
        assert_eq!(json["mentions"][0], "bob");
    }

    #[test]
    fn empty_mentions_are_omitted() {
        let json = serde_json::to_value(sample(vec![])).unwrap();
        assert!(json.get("mentions").is_none());

        let back: Message = serde_json::from_value(json).unwrap();
        assert!(back.mentions.is_empty());
    }
}
