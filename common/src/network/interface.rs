//! # Interface Selection
//!
//! Picks the local adapter an ARP sweep is sent from. The adapter owning an
//! address inside the target subnet wins; otherwise the best LAN adapter is
//! used in degraded mode. Selection itself never fails.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::IpNetwork;

#[cfg(target_os = "linux")]
use linux_impl::{is_physical, is_wireless};
#[cfg(target_os = "macos")]
use macos_impl::{is_physical, is_wireless};
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
use generic_impl::{is_physical, is_wireless};

use crate::network::subnet::Subnet;
use crate::utils::interface::NetworkInterfaceExtension;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ViabilityError {
    /// The interface is operationally down.
    IsDown,
    /// The interface was filtered out as "not physical" by the provided logic.
    NotPhysical,
    /// The interface does not have a MAC address.
    NoMacAddress,
    /// The interface does not support broadcast (required for ARP).
    NotBroadcast,
    /// The interface is a point-to-point link (e.g., a VPN).
    IsPointToPoint,
    /// The interface has no private IPv4 address to send ARP from.
    NoValidLanIp,
}

/// Outcome of mapping a subnet to a local adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceSelection {
    /// The adapter holds an address inside the target subnet.
    Matched(NetworkInterface),
    /// No adapter matched; this is the default LAN adapter.
    Fallback(NetworkInterface),
    /// The host has no adapter usable for a sweep.
    Unavailable,
}

impl InterfaceSelection {
    pub fn interface(&self) -> Option<&NetworkInterface> {
        match self {
            InterfaceSelection::Matched(intf) | InterfaceSelection::Fallback(intf) => Some(intf),
            InterfaceSelection::Unavailable => None,
        }
    }

    pub fn into_interface(self) -> Option<NetworkInterface> {
        match self {
            InterfaceSelection::Matched(intf) | InterfaceSelection::Fallback(intf) => Some(intf),
            InterfaceSelection::Unavailable => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self, InterfaceSelection::Matched(_))
    }
}

/// Selects the adapter for `subnet` among the interfaces of this host.
pub fn select_interface(subnet: &Subnet) -> InterfaceSelection {
    let interfaces: Vec<NetworkInterface> = pnet::datalink::interfaces();
    let selection = select_for_subnet(subnet, &interfaces, is_physical, is_wired);

    match &selection {
        InterfaceSelection::Matched(intf) => {
            crate::info!("Found matching interface {} for {subnet}", intf.name);
        }
        InterfaceSelection::Fallback(intf) => {
            crate::warn!(
                "No interface holds an address in {subnet}, falling back to {}",
                intf.name
            );
        }
        InterfaceSelection::Unavailable => {
            crate::warn!("No interface available for LAN discovery");
        }
    }

    selection
}

fn select_for_subnet(
    subnet: &Subnet,
    interfaces: &[NetworkInterface],
    is_physical: impl Fn(&NetworkInterface) -> bool,
    is_wired: impl Fn(&NetworkInterface) -> bool,
) -> InterfaceSelection {
    let owner = interfaces.iter().find(|intf| {
        intf.get_ipv4_nets()
            .iter()
            .any(|net| subnet.contains(net.ip()))
    });

    if let Some(intf) = owner {
        return InterfaceSelection::Matched(intf.clone());
    }

    let viable: Vec<NetworkInterface> = interfaces
        .iter()
        .filter(|intf| is_viable_lan_interface(intf, &is_physical).is_ok())
        .cloned()
        .collect();

    match select_best_lan_interface(viable, is_wired) {
        Some(intf) => InterfaceSelection::Fallback(intf),
        None => InterfaceSelection::Unavailable,
    }
}

/// Address this host would use to reach the internet, found by routing a UDP socket.
///
/// Nothing is sent; connecting a UDP socket only consults the routing table.
pub fn local_ipv4_addr() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80)).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(addr) if !addr.is_unspecified() => Some(addr),
        _ => None,
    }
}

fn is_viable_lan_interface(
    interface: &NetworkInterface,
    is_physical: impl Fn(&NetworkInterface) -> bool,
) -> Result<(), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if !is_physical(interface) {
        return Err(ViabilityError::NotPhysical);
    }
    if interface.is_loopback() {
        return Err(ViabilityError::NotPhysical);
    }
    if interface.mac.is_none() {
        return Err(ViabilityError::NoMacAddress);
    }
    if !interface.is_broadcast() {
        return Err(ViabilityError::NotBroadcast);
    }
    if interface.is_point_to_point() {
        return Err(ViabilityError::IsPointToPoint);
    }
    let has_valid_ip = interface.ips.iter().any(|net| match net {
        IpNetwork::V4(ipv4) => ipv4.ip().is_private(),
        IpNetwork::V6(_) => false,
    });
    if !has_valid_ip {
        return Err(ViabilityError::NoValidLanIp);
    }

    Ok(())
}

fn select_best_lan_interface(
    interfaces: Vec<NetworkInterface>,
    is_wired: impl Fn(&NetworkInterface) -> bool,
) -> Option<NetworkInterface> {
    match interfaces.len() {
        0 => None,
        1 => interfaces.into_iter().next(),
        _ => interfaces
            .iter()
            .find(|&interface| is_wired(interface))
            .or_else(|| interfaces.first())
            .cloned(),
    }
}

fn is_wired(interface: &NetworkInterface) -> bool {
    is_physical(interface) && !is_wireless(interface)
}

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use std::path::Path;

    pub fn is_physical(interface: &NetworkInterface) -> bool {
        Path::new(&format!("/sys/class/net/{}/device", interface.name)).exists()
    }

    pub fn is_wireless(interface: &NetworkInterface) -> bool {
        Path::new(&format!("/sys/class/net/{}/wireless", interface.name)).exists()
    }
}

#[cfg(target_os = "macos")]
mod macos_impl {
    use super::*;
    use std::collections::HashSet;
    use std::process::Command;
    use std::sync::OnceLock;

    struct HardwareInfo {
        physical_devices: HashSet<String>,
        wireless_devices: HashSet<String>,
    }

    /// Runs `networksetup` once and caches which ports are physical or wireless.
    fn get_hardware_info() -> &'static HardwareInfo {
        static HARDWARE_INFO: OnceLock<HardwareInfo> = OnceLock::new();

        HARDWARE_INFO.get_or_init(|| {
            let mut physical = HashSet::new();
            let mut wireless = HashSet::new();

            if let Ok(output) = Command::new("networksetup").arg("-listallhardwareports").output() {
                let stdout = String::from_utf8_lossy(&output.stdout);
                for line in stdout.lines() {
                    if let Some(device) = line.strip_prefix("Device: ") {
                        physical.insert(device.trim().to_string());
                    }
                }
            }

            for device in &physical {
                let is_wifi = Command::new("networksetup")
                    .arg("-getairportnetwork")
                    .arg(device)
                    .output()
                    .map(|out| out.status.success())
                    .unwrap_or(false);

                if is_wifi {
                    wireless.insert(device.clone());
                }
            }

            HardwareInfo {
                physical_devices: physical,
                wireless_devices: wireless,
            }
        })
    }

    pub fn is_physical(interface: &NetworkInterface) -> bool {
        get_hardware_info().physical_devices.contains(&interface.name)
    }

    pub fn is_wireless(interface: &NetworkInterface) -> bool {
        get_hardware_info().wireless_devices.contains(&interface.name)
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
mod generic_impl {
    use super::*;

    pub fn is_physical(interface: &NetworkInterface) -> bool {
        !interface.is_loopback()
    }

    pub fn is_wireless(_interface: &NetworkInterface) -> bool {
        false
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
