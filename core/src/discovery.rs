//! # Network Discovery Service
//!
//! Implements the "scan my network" use case.
//!
//! A scan resolves the target subnet, sweeps it with a [`HostDiscoverer`], then
//! enriches every responder with vendor, hostname and (for deep scans) open
//! ports. Only the sweep can fail the scan. Enrichment degrades single fields.

use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore, watch};
use tokio::task::JoinSet;
use tracing::debug;

use whodis_common::config::{ScanConfig, VendorConfig};
use whodis_common::error::{ErrorDescriptor, ScanError};
use whodis_common::network::device::DeviceRecord;
use whodis_common::network::interface::{self, InterfaceSelection};
use whodis_common::network::subnet::Subnet;
use whodis_common::vendors::VendorRepository;
use whodis_common::{info, warn};

use crate::network::tcp::{PortProber, TcpPortProber};
use crate::scanner::local::ArpDiscoverer;
use crate::scanner::resolver::{HostnameLookup, HostnameResolver, LookupTimeouts};
use crate::scanner::{DiscoveredHost, HostDiscoverer};
use crate::vendors::{OuiVendorRepo, TableRefresh};

/// Picks the interface a subnet is swept from.
pub type InterfaceSelector = dyn Fn(&Subnet) -> InterfaceSelection + Send + Sync;

/// Where a scan currently is. Observed through [`DiscoveryService::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    ResolvingSubnet,
    Discovering,
    Enriching,
    Done,
    Error,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScanPhase::Idle => "Idle",
            ScanPhase::ResolvingSubnet => "Resolving subnet",
            ScanPhase::Discovering => "Discovering hosts",
            ScanPhase::Enriching => "Identifying devices",
            ScanPhase::Done => "Done",
            ScanPhase::Error => "Failed",
        };
        f.write_str(label)
    }
}

/// Result of one scan pass. Exactly one of devices, nothing, or an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Found(Vec<DeviceRecord>),
    NoHosts,
    Failed(ErrorDescriptor),
}

impl ScanOutcome {
    fn from_records(records: Vec<DeviceRecord>) -> Self {
        if records.is_empty() {
            ScanOutcome::NoHosts
        } else {
            ScanOutcome::Found(records)
        }
    }

    pub fn devices(&self) -> &[DeviceRecord] {
        match self {
            ScanOutcome::Found(records) => records,
            _ => &[],
        }
    }

    pub fn error(&self) -> Option<&ErrorDescriptor> {
        match self {
            ScanOutcome::Failed(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<Vec<DeviceRecord>, ErrorDescriptor> {
        match self {
            ScanOutcome::Found(records) => Ok(records),
            ScanOutcome::NoHosts => Ok(Vec::new()),
            ScanOutcome::Failed(descriptor) => Err(descriptor),
        }
    }
}

/// Application service for network discovery.
///
/// Owns every collaborator for the lifetime of the process. Scans on the same
/// service never overlap: a second caller waits for the running one to finish.
pub struct DiscoveryService {
    discoverer: Arc<dyn HostDiscoverer>,
    vendor_repo: Arc<dyn VendorRepository>,
    hostnames: Arc<dyn HostnameLookup>,
    prober: Arc<dyn PortProber>,
    select_interface: Arc<InterfaceSelector>,
    defaults: ScanConfig,
    gate: Mutex<()>,
    phase: watch::Sender<ScanPhase>,
}

impl DiscoveryService {
    pub fn new(
        discoverer: Arc<dyn HostDiscoverer>,
        vendor_repo: Arc<dyn VendorRepository>,
        hostnames: Arc<dyn HostnameLookup>,
        prober: Arc<dyn PortProber>,
    ) -> Self {
        let (phase, _) = watch::channel(ScanPhase::Idle);
        Self {
            discoverer,
            vendor_repo,
            hostnames,
            prober,
            select_interface: Arc::new(interface::select_interface),
            defaults: ScanConfig::default(),
            gate: Mutex::new(()),
            phase,
        }
    }

    /// The production stack: ARP sweep, OUI table, DNS/NetBIOS names, TCP connects.
    pub async fn bootstrap(vendor_cfg: &VendorConfig, defaults: ScanConfig) -> (Self, TableRefresh) {
        let (vendor_repo, refresh) = OuiVendorRepo::initialize(vendor_cfg).await;
        let service = Self::new(
            Arc::new(ArpDiscoverer::new()),
            Arc::new(vendor_repo),
            Arc::new(HostnameResolver::detect()),
            Arc::new(TcpPortProber),
        )
        .with_defaults(defaults);
        (service, refresh)
    }

    pub fn with_interface_selector(mut self, selector: Arc<InterfaceSelector>) -> Self {
        self.select_interface = selector;
        self
    }

    pub fn with_defaults(mut self, defaults: ScanConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanPhase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> ScanPhase {
        *self.phase.borrow()
    }

    /// Scans `target` (or the local subnet) with the service defaults.
    pub async fn scan_subnet(&self, target: Option<Subnet>, deep_scan: bool) -> ScanOutcome {
        let cfg = self
            .defaults
            .clone()
            .with_subnet(target)
            .with_deep_scan(deep_scan);
        self.scan(&cfg).await
    }

    pub async fn scan(&self, cfg: &ScanConfig) -> ScanOutcome {
        let _running = self.gate.lock().await;

        self.set_phase(ScanPhase::ResolvingSubnet);
        let subnet = cfg.subnet.unwrap_or_else(local_subnet);

        self.set_phase(ScanPhase::Discovering);
        let hosts = match self.discover(subnet, cfg).await {
            Ok(hosts) => hosts,
            Err(e) => {
                self.set_phase(ScanPhase::Error);
                return ScanOutcome::Failed(ErrorDescriptor::from(e));
            }
        };
        info!("Found {} host(s) on {subnet}", hosts.len());

        self.set_phase(ScanPhase::Enriching);
        let records = self.enrich(hosts, cfg).await;

        self.set_phase(ScanPhase::Done);
        ScanOutcome::from_records(records)
    }

    async fn discover(&self, subnet: Subnet, cfg: &ScanConfig) -> Result<Vec<DiscoveredHost>, ScanError> {
        let intf = (self.select_interface)(&subnet)
            .into_interface()
            .ok_or_else(|| {
                ScanError::Transport(format!("no usable network interface for {subnet}"))
            })?;
        debug!("sweeping {subnet} from {}", intf.name);
        self.discoverer
            .discover(intf, subnet, cfg.discovery_timeout)
            .await
    }

    /// One record per host, in discovery order, at most `enrich_workers` at a time.
    async fn enrich(&self, hosts: Vec<DiscoveredHost>, cfg: &ScanConfig) -> Vec<DeviceRecord> {
        let semaphore = Arc::new(Semaphore::new(cfg.enrich_workers.max(1)));
        let timeouts = LookupTimeouts::from(cfg);
        let mut tasks = JoinSet::new();

        for (idx, host) in hosts.iter().copied().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let vendor_repo = Arc::clone(&self.vendor_repo);
            let hostnames = Arc::clone(&self.hostnames);
            let prober = Arc::clone(&self.prober);
            let ports = if cfg.deep_scan { cfg.ports.clone() } else { Vec::new() };
            let port_timeout = cfg.port_timeout;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let vendor = vendor_repo.vendor_or_unknown(host.mac);
                let (hostname, open_ports) = tokio::join!(
                    hostnames.lookup(host.ip, timeouts),
                    async {
                        if ports.is_empty() {
                            Vec::new()
                        } else {
                            prober.probe(host.ip, &ports, port_timeout).await
                        }
                    }
                );
                let record = DeviceRecord::new(host.ip, host.mac)
                    .with_vendor(vendor)
                    .with_hostname(hostname)
                    .with_ports(open_ports);
                (idx, record)
            });
        }

        let mut slots: Vec<Option<DeviceRecord>> = vec![None; hosts.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, record)) => slots[idx] = Some(record),
                Err(e) => warn!("Enrichment task failed: {e}"),
            }
        }

        // A lost enrichment task still leaves the host in the report.
        hosts
            .iter()
            .zip(slots)
            .map(|(host, slot)| {
                slot.unwrap_or_else(|| {
                    DeviceRecord::new(host.ip, host.mac)
                        .with_vendor(self.vendor_repo.vendor_or_unknown(host.mac))
                })
            })
            .collect()
    }

    fn set_phase(&self, phase: ScanPhase) {
        debug!("scan phase: {phase}");
        self.phase.send_replace(phase);
    }
}

fn local_subnet() -> Subnet {
    let addr = interface::local_ipv4_addr().unwrap_or_else(|| {
        warn!("Could not determine the local address, falling back to loopback");
        Ipv4Addr::LOCALHOST
    });
    Subnet::containing(addr)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
