//! # Target Subnet
//!
//! Every sweep covers a single /24 network. Targets with any other prefix are
//! narrowed to the /24 that contains the given address.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::Serialize;

pub const SUBNET_PREFIX: u8 = 24;

/// A /24 IPv4 network identified by its first three octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct Subnet {
    octets: [u8; 3],
}

impl Subnet {
    /// The /24 network that `addr` belongs to.
    pub fn containing(addr: Ipv4Addr) -> Self {
        let [a, b, c, _] = addr.octets();
        Self { octets: [a, b, c] }
    }

    pub fn network_addr(&self) -> Ipv4Addr {
        let [a, b, c] = self.octets;
        Ipv4Addr::new(a, b, c, 0)
    }

    pub fn broadcast_addr(&self) -> Ipv4Addr {
        let [a, b, c] = self.octets;
        Ipv4Addr::new(a, b, c, 255)
    }

    /// True when `addr` shares the first three octets of this subnet.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        addr.octets()[..3] == self.octets
    }

    /// Usable host addresses, `.1` through `.254`.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        let [a, b, c] = self.octets;
        (1..=254u8).map(move |d| Ipv4Addr::new(a, b, c, d))
    }

    pub fn host_count(&self) -> usize {
        254
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network_addr(), SUBNET_PREFIX)
    }
}

impl From<Subnet> for String {
    fn from(subnet: Subnet) -> Self {
        subnet.to_string()
    }
}

impl FromStr for Subnet {
    type Err = String;

    /// Parses `a.b.c.d/nn` or a bare `a.b.c.d`.
    ///
    /// A prefix other than 24 is accepted but narrowed to the /24 around the address.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (addr_part, prefix_part) = match trimmed.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (trimmed, None),
        };

        let addr: Ipv4Addr = addr_part
            .parse()
            .map_err(|_| format!("invalid subnet address: {addr_part}"))?;

        if let Some(prefix) = prefix_part {
            let prefix: u8 = prefix
                .parse()
                .map_err(|_| format!("invalid subnet prefix: {prefix}"))?;
            if prefix > 32 {
                return Err(format!("invalid subnet prefix: {prefix}"));
            }
            if prefix != SUBNET_PREFIX {
                crate::warn!("Only /24 networks are swept, narrowing {trimmed} to /24");
            }
        }

        Ok(Self::containing(addr))
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
