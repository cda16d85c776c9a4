use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use relay_types::marker;

/// Bind the first free port in `[start, start + attempts)`.
pub async fn bind_with_auto_increment(
    host: &str,
    start: u16,
    attempts: u16,
) -> Result<(TcpListener, u16)> {
    let last = start.saturating_add(attempts.saturating_sub(1));

    for port in start..=last {
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid bind address {host}:{port}"))?;

        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok((listener, port)),
            Err(e) => debug!("Port {} unavailable: {}", port, e),
        }
    }

    bail!("no available port found in range {}-{}", start, last)
}

/// Port and pid files advertising a running server. Removed on drop.
#[derive(Debug)]
pub struct MarkerFiles {
    port_file: PathBuf,
    pid_file: PathBuf,
}

impl MarkerFiles {
    pub fn write(relay_dir: &Path, port: u16) -> Result<Self> {
        let port_file = relay_dir.join(marker::PORT_FILE);
        let pid_file = relay_dir.join(marker::PID_FILE);

        std::fs::write(&port_file, port.to_string())
            .with_context(|| format!("write port file {}", port_file.display()))?;

        if let Err(e) = std::fs::write(&pid_file, std::process::id().to_string()) {
            let _ = std::fs::remove_file(&port_file);
            return Err(e).with_context(|| format!("write pid file {}", pid_file.display()));
        }

        info!("Wrote marker files in {}", relay_dir.display());
        Ok(Self {
            port_file,
            pid_file,
        })
    }
}

impl Drop for MarkerFiles {
    fn drop(&mut self) {
        for path in [&self.port_file, &self.pid_file] {
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

pub async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
