use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use relay_types::{Message, Presence};
use rusqlite::{Connection, Row};

use crate::Database;
use crate::models::{MessageRow, PresenceRow};
use crate::timestamp::format_timestamp;

const MESSAGE_COLUMNS: &str = "SELECT id, ts, sender, body, mentions FROM messages";

impl Database {
    // -- Messages --

    /// Append a message. `id` and `ts` are assigned by SQLite.
    pub fn insert_message(&self, sender: &str, body: &str, mentions: &[String]) -> Result<Message> {
        let mentions_json = serde_json::to_string(mentions).context("encode mentions")?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (sender, body, mentions) VALUES (?1, ?2, ?3)",
                (sender, body, &mentions_json),
            )
            .context("insert message")?;

            let id = conn.last_insert_rowid();
            query_message_by_id(conn, id).context("read back inserted message")
        })
    }

    /// Every message with `id > since_id`, oldest first.
    pub fn get_messages_since(&self, since_id: i64) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            query_messages(
                conn,
                &format!("{MESSAGE_COLUMNS} WHERE id > ?1 ORDER BY id ASC"),
                rusqlite::params![since_id],
            )
            .context("get messages since")
        })
    }

    /// Messages after `since_id` whose body contains `entity` anywhere
    /// (case-insensitive), or contains `@all`.
    ///
    /// This is a substring match on the raw body, so plain text such as
    /// "hey bob" matches `bob` without an `@`.
    pub fn get_messages_for_entity(&self, entity: &str, since_id: i64) -> Result<Vec<Message>> {
        let pattern = format!("%{entity}%");
        self.with_conn(|conn| {
            query_messages(
                conn,
                &format!(
                    "{MESSAGE_COLUMNS}
                     WHERE id > ?1
                     AND (
                         LOWER(body) LIKE LOWER(?2)
                         OR LOWER(body) LIKE '%@all%'
                     )
                     ORDER BY id ASC"
                ),
                rusqlite::params![since_id, pattern],
            )
            .context("get messages for entity")
        })
    }

    /// The newest `limit` messages, returned oldest first.
    pub fn get_recent_messages(&self, limit: u32) -> Result<Vec<Message>> {
        let mut messages = self.with_conn(|conn| {
            query_messages(
                conn,
                &format!("{MESSAGE_COLUMNS} ORDER BY id DESC LIMIT ?1"),
                rusqlite::params![limit],
            )
            .context("get recent messages")
        })?;

        messages.reverse();
        Ok(messages)
    }

    /// Delete the whole message log. Presence is untouched.
    pub fn clear_messages(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM messages", []).context("clear messages")?;
            Ok(())
        })
    }

    // -- Presence --

    pub fn update_presence(&self, name: &str) -> Result<()> {
        self.update_presence_at(name, Utc::now())
    }

    /// Upsert `name` with `last_seen = when`. An earlier `when` is not rejected.
    pub fn update_presence_at(&self, name: &str, when: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO presence (name, last_seen) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET last_seen = excluded.last_seen",
                (name, format_timestamp(when)),
            )
            .context("update presence")?;
            Ok(())
        })
    }

    /// Names active within the last `window_minutes`, most recent first.
    /// The window is evaluated against the clock at call time.
    pub fn get_presence(&self, window_minutes: f64) -> Result<Vec<Presence>> {
        let cutoff = format_timestamp(presence_cutoff(Utc::now(), window_minutes));

        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT name, last_seen FROM presence
                     WHERE last_seen > ?1
                     ORDER BY last_seen DESC",
                )
                .context("get presence")?;

            let rows = stmt
                .query_map([cutoff], |row| {
                    Ok(PresenceRow {
                        name: row.get(0)?,
                        last_seen: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("get presence")?;

            Ok(rows.into_iter().map(PresenceRow::into_presence).collect())
        })
    }

    /// Remove every presence row.
    pub fn clear_presence(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM presence", []).context("clear presence")?;
            Ok(())
        })
    }
}

/// Start of the presence window. Windows too large to represent reach back
/// to the epoch; a zero, negative or NaN window admits nobody.
fn presence_cutoff(now: DateTime<Utc>, window_minutes: f64) -> DateTime<Utc> {
    if window_minutes.is_nan() || window_minutes <= 0.0 {
        return now;
    }
    // Float to int casts saturate.
    let millis = (window_minutes * 60_000.0) as i64;
    TimeDelta::try_milliseconds(millis)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

fn query_message_by_id(conn: &Connection, id: i64) -> Result<Message> {
    let row = conn.query_row(&format!("{MESSAGE_COLUMNS} WHERE id = ?1"), [id], map_message_row)?;
    Ok(row.into_message())
}

fn query_messages(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(sql)?;

    let rows = stmt
        .query_map(params, map_message_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows.into_iter().map(MessageRow::into_message).collect())
}

fn map_message_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        ts: row.get(1)?,
        sender: row.get(2)?,
        body: row.get(3)?,
        mentions: row.get(4)?,
    })
}
