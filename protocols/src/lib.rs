//! Raw frame construction and parsing for the discovery sweep.

pub mod arp;
pub mod ethernet;

pub const ETH_HDR_LEN: usize = 14;
pub const ARP_LEN: usize = 28;
/// Shortest Ethernet frame without the FCS; ARP requests are zero-padded to it.
pub const MIN_ETH_FRAME_NO_FCS: usize = 60;
