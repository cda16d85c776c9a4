use std::fmt;
use std::path::Path;

use crate::addresses::listen_addresses;
use crate::client::RelayClient;
use crate::discover;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayStatus {
    /// A live process owns the marker directory.
    Running {
        pid: u32,
        port: u16,
        /// Every URL the relay answers on, localhost first.
        addresses: Vec<String>,
        active: Vec<String>,
    },
    /// A pid file exists but its process is gone.
    StalePid,
    /// No pid file, but the server answered at this URL.
    Reachable(String),
    NotRunning,
    NoRelayDir,
}

impl RelayStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, Self::Running { .. } | Self::Reachable(_))
    }
}

impl fmt::Display for RelayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running {
                pid,
                port,
                addresses,
                active,
            } => {
                write!(f, "relay running (pid {pid}, port {port})")?;
                for addr in addresses {
                    write!(f, "\n  {addr}")?;
                }
                if !active.is_empty() {
                    write!(f, "\nactive agents: {}", active.join(", "))?;
                }
                Ok(())
            }
            Self::StalePid => write!(f, "relay not running (stale pid file)"),
            Self::Reachable(url) => write!(f, "relay reachable at {url}"),
            Self::NotRunning => write!(f, "relay not running"),
            Self::NoRelayDir => write!(f, "relay not running (no .colony-relay/ found)"),
        }
    }
}

/// Inspect the marker directory above `cwd`, falling back to probing the
/// server directly when there is no pid file.
pub async fn check(server_flag: Option<&str>, cwd: &Path) -> RelayStatus {
    let server_flag = server_flag.filter(|s| !s.is_empty());
    let relay_dir = discover::find_relay_dir(cwd).ok();

    if let Some(dir) = &relay_dir {
        if let Ok(pid) = discover::read_pid(dir) {
            if !process_alive(pid) {
                return RelayStatus::StalePid;
            }
            let port = discover::read_port(dir).unwrap_or(0);
            let url = server_flag
                .map(str::to_string)
                .unwrap_or_else(|| format!("http://localhost:{port}"));
            let active = RelayClient::new(&url)
                .fetch_presence()
                .await
                .map(|presence| presence.into_iter().map(|p| p.name).collect())
                .unwrap_or_default();
            let addresses = listen_addresses(port).await;
            return RelayStatus::Running {
                pid,
                port,
                addresses,
                active,
            };
        }
    }

    let url = match server_flag {
        Some(url) => url.to_string(),
        None => match relay_dir.and_then(|_| discover::server_url(cwd).ok()) {
            Some(url) => url,
            None => return RelayStatus::NoRelayDir,
        },
    };

    if RelayClient::new(&url).is_reachable().await {
        RelayStatus::Reachable(url)
    } else {
        RelayStatus::NotRunning
    }
}

/// Whether a process with `pid` exists.
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // Signal 0 performs the permission and existence checks without
    // delivering anything. EPERM means the process exists.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub fn process_alive(_pid: u32) -> bool {
    true
}
