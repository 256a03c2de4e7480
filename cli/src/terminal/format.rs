use std::net::{IpAddr, Ipv6Addr};

use colored::*;

use whodis_common::network::device::{DeviceRecord, OpenPort};

use crate::terminal::colors;

pub type Detail = (String, ColoredString);

pub fn ipv6_to_type_str(ipv6_addr: &Ipv6Addr) -> &'static str {
    if is_global_unicast(&IpAddr::V6(*ipv6_addr)) {
        return "GUA";
    }
    if ipv6_addr.is_unique_local() {
        return "ULA";
    }
    if ipv6_addr.is_unicast_link_local() {
        return "LLA";
    }
    "IPv6"
}

// 2000::/3
fn is_global_unicast(ip_addr: &IpAddr) -> bool {
    match ip_addr {
        IpAddr::V6(ipv6_addr) => {
            let first_byte = ipv6_addr.octets()[0];
            0x3F >= first_byte && first_byte >= 0x20
        }
        _ => false,
    }
}

pub fn device_details(device: &DeviceRecord) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![
        ("IPv4".to_string(), device.ip.to_string().color(colors::IPV4_ADDR)),
        ("MAC".to_string(), device.mac.to_string().color(colors::MAC_ADDR)),
        ("Vendor".to_string(), device.vendor.as_str().color(colors::VENDOR)),
    ];
    if !device.ports.is_empty() {
        details.push(("Ports".to_string(), ports_to_string(&device.ports).color(colors::PORT)));
    }
    details
}

pub fn ports_to_string(ports: &[OpenPort]) -> String {
    ports
        .iter()
        .map(|open| format!("{} ({})", open.port, open.service))
        .collect::<Vec<String>>()
        .join(", ")
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
