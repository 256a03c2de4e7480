use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio::time::timeout;

use whodis_common::network::device::OpenPort;

/// Finds which of a set of candidate ports accept a TCP connection.
#[async_trait]
pub trait PortProber: Send + Sync {
    /// Open ports of `ip`, in the order of `ports`. Never fails: anything
    /// short of a completed handshake counts as closed.
    async fn probe(&self, ip: Ipv4Addr, ports: &[u16], probe_timeout: Duration) -> Vec<OpenPort>;
}

/// Probes with a full connect, closed again as soon as it succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpPortProber;

#[async_trait]
impl PortProber for TcpPortProber {
    async fn probe(&self, ip: Ipv4Addr, ports: &[u16], probe_timeout: Duration) -> Vec<OpenPort> {
        probe_in_order(ports, |port| {
            handshake_probe(SocketAddr::new(IpAddr::V4(ip), port), probe_timeout)
        })
        .await
    }
}

/// Runs `prober` for every port at once and reports the open ones in
/// candidate order, whatever order the probes finish in.
pub async fn probe_in_order<F, Fut>(ports: &[u16], mut prober: F) -> Vec<OpenPort>
where
    F: FnMut(u16) -> Fut,
    Fut: Future<Output = bool> + Send + 'static,
{
    let mut probes = JoinSet::new();
    for (idx, &port) in ports.iter().enumerate() {
        let probe = prober(port);
        probes.spawn(async move { (idx, probe.await) });
    }

    let mut open = vec![false; ports.len()];
    while let Some(joined) = probes.join_next().await {
        if let Ok((idx, true)) = joined {
            open[idx] = true;
        }
    }

    ports
        .iter()
        .zip(open)
        .filter(|(_, is_open)| *is_open)
        .map(|(&port, _)| OpenPort::new(port))
        .collect()
}

pub async fn handshake_probe(addr: SocketAddr, probe_timeout: Duration) -> bool {
    matches!(
        timeout(probe_timeout, TcpStream::connect(addr)).await,
        Ok(Ok(_))
    )
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
