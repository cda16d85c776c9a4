//! Server configuration.
//!
//! Read from `RELAY_*` environment variables; `main` loads `.env` first.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use relay_api::DEFAULT_PRESENCE_MINUTES;
use relay_types::marker;

const DEFAULT_PORT: u16 = 4100;
const DEFAULT_PORT_ATTEMPTS: u16 = 100;
/// One year.
const MAX_PRESENCE_MINUTES: f64 = 525_600.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Address to bind to.
    pub host: String,
    /// First port tried.
    pub port: u16,
    /// Consecutive ports tried before giving up.
    pub port_attempts: u16,
    /// Marker directory holding the port/pid files.
    pub relay_dir: PathBuf,
    /// SQLite file backing the store.
    pub db_path: PathBuf,
    /// Presence window in minutes.
    pub presence_minutes: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = get("RELAY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or(&get, "RELAY_PORT", DEFAULT_PORT)?;
        let port_attempts = parse_or(&get, "RELAY_PORT_ATTEMPTS", DEFAULT_PORT_ATTEMPTS)?;
        let presence_minutes = parse_or(&get, "RELAY_PRESENCE_MINUTES", DEFAULT_PRESENCE_MINUTES)?;
        if !(presence_minutes.is_finite() && presence_minutes > 0.0)
            || presence_minutes > MAX_PRESENCE_MINUTES
        {
            bail!(
                "invalid RELAY_PRESENCE_MINUTES: {presence_minutes} (must be between 0 and {MAX_PRESENCE_MINUTES})"
            );
        }

        let relay_dir: PathBuf = get("RELAY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(marker::RELAY_DIR));
        let db_path = get("RELAY_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| relay_dir.join(marker::DB_FILE));

        Ok(Self {
            host,
            port,
            port_attempts: port_attempts.max(1),
            relay_dir,
            db_path,
            presence_minutes,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: {raw:?}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.host, "0.0.0.0");
        assert_eq!(c.port, 4100);
        assert_eq!(c.port_attempts, 100);
        assert_eq!(c.relay_dir, PathBuf::from(".colony-relay"));
        assert_eq!(c.db_path, PathBuf::from(".colony-relay/relay.db"));
        assert_eq!(c.presence_minutes, 30.0);
    }

    #[test]
    fn db_path_follows_relay_dir() {
        let c = config(&[("RELAY_DIR", "/tmp/relay")]).unwrap();
        assert_eq!(c.db_path, PathBuf::from("/tmp/relay/relay.db"));

        let c = config(&[("RELAY_DIR", "/tmp/relay"), ("RELAY_DB_PATH", "/data/x.db")]).unwrap();
        assert_eq!(c.db_path, PathBuf::from("/data/x.db"));
    }

    #[test]
    fn overrides_are_parsed() {
        let c = config(&[
            ("RELAY_PORT", "5000"),
            ("RELAY_PORT_ATTEMPTS", "3"),
            ("RELAY_PRESENCE_MINUTES", "2.5"),
        ])
        .unwrap();
        assert_eq!(c.port, 5000);
        assert_eq!(c.port_attempts, 3);
        assert_eq!(c.presence_minutes, 2.5);
    }

    #[test]
    fn invalid_numbers_are_errors() {
        let err = config(&[("RELAY_PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("RELAY_PORT"));
        assert!(config(&[("RELAY_PRESENCE_MINUTES", "soon")]).is_err());
    }

    #[test]
    fn presence_window_must_be_finite_and_in_range() {
        for bad in ["inf", "-inf", "NaN", "1e18", "0", "-5", "525601"] {
            let err = config(&[("RELAY_PRESENCE_MINUTES", bad)]).unwrap_err();
            assert!(
                err.to_string().starts_with("invalid RELAY_PRESENCE_MINUTES"),
                "{bad}: {err}"
            );
        }
        let c = config(&[("RELAY_PRESENCE_MINUTES", "525600")]).unwrap();
        assert_eq!(c.presence_minutes, 525_600.0);
    }
}
