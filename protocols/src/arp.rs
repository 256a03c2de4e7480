use std::net::Ipv4Addr;

use anyhow::{Context, ensure};
use pnet::packet::Packet;
use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::EtherTypes;
use pnet::util::MacAddr;

use whodis_common::network::subnet::Subnet;

use crate::{ARP_LEN, ETH_HDR_LEN, MIN_ETH_FRAME_NO_FCS, ethernet};

/// Sender fields of an ARP reply: who answered and from which hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpReply {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
}

/// Builds a broadcast "who-has `dst_addr`" frame.
pub fn create_request(
    src_mac: MacAddr,
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
) -> anyhow::Result<Vec<u8>> {
    let mut buffer = [0u8; MIN_ETH_FRAME_NO_FCS];
    ethernet::make_header(&mut buffer, src_mac, MacAddr::broadcast(), EtherTypes::Arp)?;
    let mut arp_packet = MutableArpPacket::new(&mut buffer[ETH_HDR_LEN..ETH_HDR_LEN + ARP_LEN])
        .context("failed to create mutable ARP packet")?;
    arp_packet.set_hardware_type(ArpHardwareTypes::Ethernet);
    arp_packet.set_protocol_type(EtherTypes::Ipv4);
    arp_packet.set_hw_addr_len(6);
    arp_packet.set_proto_addr_len(4);
    arp_packet.set_operation(ArpOperations::Request);
    arp_packet.set_sender_hw_addr(src_mac);
    arp_packet.set_target_hw_addr(MacAddr::zero());
    arp_packet.set_sender_proto_addr(src_addr);
    arp_packet.set_target_proto_addr(dst_addr);
    Ok(Vec::from(buffer))
}

/// One request per host address of `subnet`, skipping the sender's own address.
pub fn create_sweep(
    src_mac: MacAddr,
    src_addr: Ipv4Addr,
    subnet: &Subnet,
) -> anyhow::Result<Vec<Vec<u8>>> {
    subnet
        .hosts()
        .filter(|addr| *addr != src_addr)
        .map(|dst_addr| create_request(src_mac, src_addr, dst_addr))
        .collect()
}

/// Extracts the sender of an ARP reply from a raw Ethernet frame.
pub fn get_reply(frame: &[u8]) -> anyhow::Result<ArpReply> {
    let ethernet_packet = ethernet::get_packet_from_u8(frame)?;
    ensure!(
        ethernet_packet.get_ethertype() == EtherTypes::Arp,
        "not an ARP frame (ethertype {})",
        ethernet_packet.get_ethertype()
    );
    let arp_packet = ArpPacket::new(ethernet_packet.payload()).with_context(|| {
        format!(
            "truncated or invalid ARP packet (payload len {})",
            ethernet_packet.payload().len()
        )
    })?;
    ensure!(
        arp_packet.get_operation() == ArpOperations::Reply,
        "ARP packet is not a reply"
    );
    Ok(ArpReply {
        ip: arp_packet.get_sender_proto_addr(),
        mac: arp_packet.get_sender_hw_addr(),
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
