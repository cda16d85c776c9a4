use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")
        .context("create schema_version")?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
        .context("read schema version")?;

    if version < 1 {
        info!("Running migration v1 (messages, presence)");
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS messages (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                ts          DATETIME DEFAULT CURRENT_TIMESTAMP,
                sender      TEXT NOT NULL,
                body        TEXT NOT NULL,
                mentions    TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS idx_messages_ts ON messages(ts);

            CREATE TABLE IF NOT EXISTS presence (
                name        TEXT PRIMARY KEY,
                last_seen   DATETIME NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )
        .context("migration v1")?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
