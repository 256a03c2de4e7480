//! Host discovery and hostname resolution.
//!
//! The orchestrator only talks to the traits in this module. [`local`] holds the
//! ARP implementation of [`HostDiscoverer`], [`resolver`] the reverse lookup
//! chain behind [`resolver::HostnameLookup`].

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use pnet::datalink::NetworkInterface;
use pnet::util::MacAddr;

use whodis_common::error::ScanError;
use whodis_common::network::subnet::Subnet;

pub mod local;
pub mod netbios;
pub mod resolver;

/// One responder of the discovery sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiscoveredHost {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
}

/// Finds the live hosts of a subnet.
#[async_trait]
pub trait HostDiscoverer: Send + Sync {
    /// Hosts in the order their replies arrived, at most one per address.
    ///
    /// Fails only when the sweep itself cannot run: the channel cannot be
    /// opened, or sending or receiving on it breaks.
    async fn discover(
        &self,
        intf: NetworkInterface,
        subnet: Subnet,
        listen_for: Duration,
    ) -> Result<Vec<DiscoveredHost>, ScanError>;
}
