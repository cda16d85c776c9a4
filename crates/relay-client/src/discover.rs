//! Locate a running relay through the marker directory it leaves behind.

use std::path::{Path, PathBuf};

use relay_types::marker;

use crate::error::{ClientError, Result};

/// Environment variable that overrides discovery.
pub const SERVER_ENV: &str = "RELAY_SERVER";

/// Walk up from `start` to the nearest directory containing `.colony-relay/`.
/// Returns the path of the `.colony-relay` directory itself.
pub fn find_relay_dir(start: &Path) -> Result<PathBuf> {
    let start_abs = std::path::absolute(start)?;

    let mut dir = start_abs.as_path();
    loop {
        let candidate = dir.join(marker::RELAY_DIR);
        if candidate.is_dir() {
            return Ok(candidate);
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => {
                return Err(ClientError::NoRelayDir {
                    dir: marker::RELAY_DIR,
                    start: start.to_path_buf(),
                });
            }
        }
    }
}

pub fn read_port(relay_dir: &Path) -> Result<u16> {
    read_number(relay_dir, marker::PORT_FILE, "port")
}

pub fn read_pid(relay_dir: &Path) -> Result<u32> {
    read_number(relay_dir, marker::PID_FILE, "pid")
}

fn read_number<T>(relay_dir: &Path, file: &str, what: &'static str) -> Result<T>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    let data = std::fs::read_to_string(relay_dir.join(file))
        .map_err(|source| ClientError::ReadMarker { what, source })?;
    data.trim()
        .parse()
        .map_err(|source| ClientError::ParseMarker { what, source })
}

/// `http://localhost:<port>` for the relay discovered from `start`.
pub fn server_url(start: &Path) -> Result<String> {
    let dir = find_relay_dir(start)?;
    let port = read_port(&dir)?;
    Ok(format!("http://localhost:{port}"))
}

/// Explicit flag, then `RELAY_SERVER`, then discovery from the working directory.
pub fn resolve_server_url(flag: Option<&str>) -> Result<String> {
    let env = std::env::var(SERVER_ENV).ok();
    let cwd = std::env::current_dir()?;
    resolve_with(flag, env.as_deref(), &cwd)
}

fn resolve_with(flag: Option<&str>, env: Option<&str>, cwd: &Path) -> Result<String> {
    if let Some(url) = flag.filter(|s| !s.is_empty()) {
        return Ok(url.to_string());
    }
    if let Some(url) = env.filter(|s| !s.is_empty()) {
        return Ok(url.to_string());
    }
    server_url(cwd)
}
