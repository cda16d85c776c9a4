//! URLs under which a relay on this machine can be reached.

use std::net::Ipv4Addr;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

const TAILSCALE_TIMEOUT: Duration = Duration::from_secs(2);

/// `http://localhost:<port>` first, then every LAN IPv4 address, then the
/// Tailscale DNS name when `tailscale` is installed and logged in.
pub async fn listen_addresses(port: u16) -> Vec<String> {
    let mut hosts = vec!["localhost".to_string()];
    hosts.extend(lan_ipv4_addrs().iter().map(Ipv4Addr::to_string));
    hosts.extend(tailscale_host().await);

    let mut urls: Vec<String> = Vec::with_capacity(hosts.len());
    for host in hosts {
        let url = format!("http://{host}:{port}");
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

/// IPv4 addresses of interfaces that are up and not loopback.
#[cfg(unix)]
pub fn lan_ipv4_addrs() -> Vec<Ipv4Addr> {
    let mut addrs = Vec::new();
    let mut head: *mut libc::ifaddrs = std::ptr::null_mut();

    if unsafe { libc::getifaddrs(&mut head) } != 0 {
        debug!("getifaddrs failed: {}", std::io::Error::last_os_error());
        return addrs;
    }

    let mut cur = head;
    while !cur.is_null() {
        // SAFETY: `cur` walks the list getifaddrs returned, which stays valid
        // until freeifaddrs below.
        let ifa = unsafe { &*cur };
        cur = ifa.ifa_next;

        let flags = ifa.ifa_flags as libc::c_int;
        if flags & libc::IFF_UP == 0 || flags & libc::IFF_LOOPBACK != 0 {
            continue;
        }
        if ifa.ifa_addr.is_null() {
            continue;
        }
        if unsafe { (*ifa.ifa_addr).sa_family } as libc::c_int != libc::AF_INET {
            continue;
        }

        let sin = unsafe { &*(ifa.ifa_addr as *const libc::sockaddr_in) };
        addrs.push(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)));
    }

    unsafe { libc::freeifaddrs(head) };
    addrs
}

#[cfg(not(unix))]
pub fn lan_ipv4_addrs() -> Vec<Ipv4Addr> {
    Vec::new()
}

async fn tailscale_host() -> Option<String> {
    let output = tokio::process::Command::new("tailscale")
        .args(["status", "--json"])
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(TAILSCALE_TIMEOUT, output).await {
        Ok(Ok(out)) if out.status.success() => parse_tailscale_host(&out.stdout),
        Ok(Ok(out)) => {
            debug!("tailscale status exited with {}", out.status);
            None
        }
        Ok(Err(e)) => {
            debug!("tailscale not available: {}", e);
            None
        }
        Err(_) => {
            debug!("tailscale status timed out");
            None
        }
    }
}

#[derive(Deserialize)]
struct TailscaleStatus {
    #[serde(rename = "Self")]
    this_node: Option<TailscaleNode>,
}

#[derive(Deserialize)]
struct TailscaleNode {
    #[serde(rename = "DNSName", default)]
    dns_name: String,
}

/// This node's MagicDNS name from `tailscale status --json`, without the
/// trailing dot.
pub fn parse_tailscale_host(json: &[u8]) -> Option<String> {
    let status: TailscaleStatus = serde_json::from_slice(json).ok()?;
    let name = status.this_node?.dns_name;
    let name = name.trim().trim_end_matches('.');
    (!name.is_empty()).then(|| name.to_string())
}
