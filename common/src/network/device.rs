//! # Device Records
//!
//! The shape handed to downstream collaborators (history storage, summarization)
//! once a scan completes.

use std::net::Ipv4Addr;

use pnet::util::MacAddr;
use serde::{Serialize, Serializer};

use crate::vendors::UNKNOWN_VENDOR;

/// Well-known service labels reported for open ports.
const PORT_SERVICES: &[(u16, &str)] = &[
    (21, "FTP"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (110, "POP3"),
    (139, "NetBIOS"),
    (143, "IMAP"),
    (443, "HTTPS"),
    (445, "SMB"),
    (993, "IMAPS"),
    (995, "POP3S"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (5432, "PostgreSQL"),
    (5900, "VNC"),
    (8080, "HTTP-Proxy"),
    (8443, "HTTPS-Alt"),
];

/// Label for `port`, `Port-<n>` when it is not a well-known service.
pub fn service_name(port: u16) -> String {
    PORT_SERVICES
        .iter()
        .find(|(known, _)| *known == port)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| format!("Port-{port}"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenPort {
    pub port: u16,
    pub service: String,
}

impl OpenPort {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            service: service_name(port),
        }
    }
}

/// A host that answered the ARP sweep, with whatever enrichment succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    pub ip: Ipv4Addr,
    #[serde(serialize_with = "serialize_mac")]
    pub mac: MacAddr,
    pub vendor: String,
    pub hostname: Option<String>,
    /// Always empty unless the scan was a deep scan.
    pub ports: Vec<OpenPort>,
}

impl DeviceRecord {
    pub fn new(ip: Ipv4Addr, mac: MacAddr) -> Self {
        Self {
            ip,
            mac,
            vendor: UNKNOWN_VENDOR.to_string(),
            hostname: None,
            ports: Vec::new(),
        }
    }

    pub fn with_vendor(mut self, vendor: String) -> Self {
        self.vendor = vendor;
        self
    }

    pub fn with_hostname(mut self, hostname: Option<String>) -> Self {
        self.hostname = hostname;
        self
    }

    pub fn with_ports(mut self, ports: Vec<OpenPort>) -> Self {
        self.ports = ports;
        self
    }
}

fn serialize_mac<S: Serializer>(mac: &MacAddr, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(mac)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
