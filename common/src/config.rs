use std::time::Duration;

use crate::network::subnet::Subnet;

pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_PORT_TIMEOUT: Duration = Duration::from_millis(500);
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_NETBIOS_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_ENRICH_WORKERS: usize = 16;

/// Ports probed on every host of a deep scan, in report order.
pub const DEFAULT_PORTS: &[u16] = &[22, 80, 443, 445, 3389, 8080];

/// Settings for one scan pass. Never mutated once the pass has started.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Subnet to sweep. Derived from the local address when absent.
    pub subnet: Option<Subnet>,
    /// Probes [`ScanConfig::ports`] on every discovered host.
    pub deep_scan: bool,
    /// How long ARP replies are collected.
    pub discovery_timeout: Duration,
    /// Per-port TCP connect budget.
    pub port_timeout: Duration,
    pub ports: Vec<u16>,
    pub dns_timeout: Duration,
    pub netbios_timeout: Duration,
    /// Upper bound on hosts enriched at the same time.
    pub enrich_workers: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            subnet: None,
            deep_scan: false,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            port_timeout: DEFAULT_PORT_TIMEOUT,
            ports: DEFAULT_PORTS.to_vec(),
            dns_timeout: DEFAULT_DNS_TIMEOUT,
            netbios_timeout: DEFAULT_NETBIOS_TIMEOUT,
            enrich_workers: DEFAULT_ENRICH_WORKERS,
        }
    }
}

impl ScanConfig {
    pub fn with_subnet(mut self, subnet: Option<Subnet>) -> Self {
        self.subnet = subnet;
        self
    }

    pub fn with_deep_scan(mut self, deep_scan: bool) -> Self {
        self.deep_scan = deep_scan;
        self
    }

    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    pub fn with_port_timeout(mut self, timeout: Duration) -> Self {
        self.port_timeout = timeout;
        self
    }

    pub fn with_ports(mut self, ports: Vec<u16>) -> Self {
        self.ports = ports;
        self
    }
}

/// Where the vendor table comes from and whether it is refreshed at startup.
#[derive(Debug, Clone)]
pub struct VendorConfig {
    /// Attempts a download of the OUI table before loading it.
    pub refresh: bool,
    pub source_url: String,
    /// File the downloaded table is written to and read back from.
    pub cache_path: Option<std::path::PathBuf>,
    pub refresh_timeout: Duration,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            refresh: true,
            source_url: String::from("https://macaddress.io/database/macaddress.io-db.csv"),
            cache_path: Some(std::env::temp_dir().join("whodis").join("oui.csv")),
            refresh_timeout: Duration::from_secs(10),
        }
    }
}
