use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use dns_lookup::lookup_addr;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use whodis_common::config::ScanConfig;

use super::netbios::NetbiosTool;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Per-step budgets of one hostname lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupTimeouts {
    pub dns: Duration,
    pub netbios: Duration,
}

impl From<&ScanConfig> for LookupTimeouts {
    fn from(cfg: &ScanConfig) -> Self {
        Self {
            dns: cfg.dns_timeout,
            netbios: cfg.netbios_timeout,
        }
    }
}

/// Turns an address into a human-readable name.
#[async_trait]
pub trait HostnameLookup: Send + Sync {
    /// `None` when no step of the chain produced a name. Never fails.
    async fn lookup(&self, ip: Ipv4Addr, timeouts: LookupTimeouts) -> Option<String>;
}

/// Reverse DNS, then NetBIOS when the host has a tool for it.
///
/// The variant is fixed when the resolver is built, so the platform is
/// probed once per process and never per lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostnameResolver {
    DnsOnly,
    DnsWithNetbios(NetbiosTool),
}

impl HostnameResolver {
    pub fn detect() -> Self {
        match NetbiosTool::detect() {
            Some(tool) => {
                debug!("NetBIOS fallback through {}", tool.program());
                HostnameResolver::DnsWithNetbios(tool)
            }
            None => {
                debug!("no NetBIOS tool found, hostnames come from DNS only");
                HostnameResolver::DnsOnly
            }
        }
    }
}

#[async_trait]
impl HostnameLookup for HostnameResolver {
    async fn lookup(&self, ip: Ipv4Addr, timeouts: LookupTimeouts) -> Option<String> {
        let dns = reverse_dns(ip, timeouts.dns);
        match self {
            HostnameResolver::DnsOnly => dns.await,
            HostnameResolver::DnsWithNetbios(tool) => {
                or_else_name(dns, netbios_name(*tool, ip, timeouts.netbios)).await
            }
        }
    }
}

/// `fallback` is only polled when `first` found nothing.
async fn or_else_name(
    first: impl Future<Output = Option<String>>,
    fallback: impl Future<Output = Option<String>>,
) -> Option<String> {
    match first.await {
        Some(name) => Some(name),
        None => fallback.await,
    }
}

/// Perform reverse DNS lookup for a single IP address
pub fn reverse_lookup(ip: Ipv4Addr) -> Option<String> {
    lookup_addr(&IpAddr::V4(ip))
        .ok()
        .and_then(|hostname| accept_name(ip, &hostname))
}

/// [`reverse_lookup`] on the blocking pool, abandoned after `budget`.
pub async fn reverse_dns(ip: Ipv4Addr, budget: Duration) -> Option<String> {
    match timeout(budget, tokio::task::spawn_blocking(move || reverse_lookup(ip))).await {
        Ok(Ok(name)) => name,
        Ok(Err(e)) => {
            debug!("DNS worker join failed for {ip}: {e}");
            None
        }
        Err(_) => {
            debug!("reverse DNS for {ip} timed out");
            None
        }
    }
}

async fn netbios_name(tool: NetbiosTool, ip: Ipv4Addr, budget: Duration) -> Option<String> {
    let mut cmd = Command::new(tool.program());
    cmd.args(tool.args(ip));
    query_name(tool, cmd, ip, budget).await
}

/// Runs `cmd` and parses its output as `tool`'s. The child is killed once `budget` runs out.
async fn query_name(tool: NetbiosTool, mut cmd: Command, ip: Ipv4Addr, budget: Duration) -> Option<String> {
    cmd.stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    let output = match timeout(budget, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            debug!("{} failed for {ip}: {e}", tool.program());
            return None;
        }
        Err(_) => {
            debug!("{} for {ip} timed out", tool.program());
            return None;
        }
    };

    tool.parse_name(&String::from_utf8_lossy(&output.stdout))
}

/// A resolver echoing the address back has not found a name.
fn accept_name(ip: Ipv4Addr, hostname: &str) -> Option<String> {
    let hostname = hostname.trim().trim_end_matches('.');
    if hostname.is_empty() || hostname == ip.to_string() {
        None
    } else {
        Some(hostname.to_string())
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
