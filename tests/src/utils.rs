use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pnet::datalink::{MacAddr, NetworkInterface};
use pnet::ipnetwork::{IpNetwork, Ipv4Network};

use whodis_common::error::ScanError;
use whodis_common::network::device::OpenPort;
use whodis_common::network::interface::InterfaceSelection;
use whodis_common::network::subnet::Subnet;
use whodis_common::vendors::VendorRepository;
use whodis_core::discovery::DiscoveryService;
use whodis_core::network::tcp::PortProber;
use whodis_core::scanner::resolver::{HostnameLookup, LookupTimeouts};
use whodis_core::scanner::{DiscoveredHost, HostDiscoverer};

pub fn ni(name: &str, index: u32, mac: Option<MacAddr>, ips: &[IpNetwork], flags: u32) -> NetworkInterface {
    NetworkInterface {
        name: name.into(),
        description: "".into(),
        index,
        mac,
        ips: ips.to_vec(),
        flags,
    }
}

pub fn v4(a: u8, b: u8, c: u8, d: u8, p: u8) -> IpNetwork {
    IpNetwork::V4(Ipv4Network::new(Ipv4Addr::new(a, b, c, d), p).unwrap())
}

pub fn lan() -> Subnet {
    "192.168.1.0/24".parse().unwrap()
}

pub fn host(last: u8) -> DiscoveredHost {
    DiscoveredHost {
        ip: Ipv4Addr::new(192, 168, 1, last),
        mac: MacAddr::new(0x3c, 0x22, 0xfb, 0, 0, last),
    }
}

/// Tracks how many calls are running at once and the highest value seen.
#[derive(Default)]
pub struct Concurrency {
    current: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicUsize,
}

impl Concurrency {
    pub async fn track<F: std::future::Future>(&self, fut: F) -> F::Output {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        let out = fut.await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        out
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

pub enum Sweep {
    Hosts(Vec<DiscoveredHost>),
    PermissionDenied,
}

pub struct FakeDiscoverer {
    pub sweep: Sweep,
    pub delay: Duration,
    pub calls: Concurrency,
}

impl FakeDiscoverer {
    pub fn finding(hosts: Vec<DiscoveredHost>) -> Self {
        Self {
            sweep: Sweep::Hosts(hosts),
            delay: Duration::ZERO,
            calls: Concurrency::default(),
        }
    }

    pub fn denied() -> Self {
        Self {
            sweep: Sweep::PermissionDenied,
            delay: Duration::ZERO,
            calls: Concurrency::default(),
        }
    }
}

#[async_trait]
impl HostDiscoverer for FakeDiscoverer {
    async fn discover(
        &self,
        intf: NetworkInterface,
        _subnet: Subnet,
        _listen_for: Duration,
    ) -> Result<Vec<DiscoveredHost>, ScanError> {
        self.calls
            .track(async {
                tokio::time::sleep(self.delay).await;
                match &self.sweep {
                    Sweep::Hosts(hosts) => Ok(hosts.clone()),
                    Sweep::PermissionDenied => Err(ScanError::Permission(format!(
                        "opening on {}: Operation not permitted",
                        intf.name
                    ))),
                }
            })
            .await
    }
}

/// Knows a single OUI.
pub struct AppleOnly;

impl VendorRepository for AppleOnly {
    fn get_vendor(&self, mac: MacAddr) -> Option<String> {
        let MacAddr(a, b, c, ..) = mac;
        ((a, b, c) == (0x3c, 0x22, 0xfb)).then(|| "Apple, Inc.".to_string())
    }
}

/// Names hosts `host-<last octet>-<n>`, where n counts lookups, and
/// answers later for lower addresses.
#[derive(Default)]
pub struct CountingNames {
    pub calls: Concurrency,
    pub unnamed: Vec<Ipv4Addr>,
}

#[async_trait]
impl HostnameLookup for CountingNames {
    async fn lookup(&self, ip: Ipv4Addr, _timeouts: LookupTimeouts) -> Option<String> {
        self.calls
            .track(async {
                let last = ip.octets()[3];
                tokio::time::sleep(Duration::from_millis(u64::from(255 - last) / 10)).await;
                if self.unnamed.contains(&ip) {
                    None
                } else {
                    Some(format!("host-{last}-{}", self.calls.total()))
                }
            })
            .await
    }
}

/// Reports every even candidate port as open.
#[derive(Default)]
pub struct EvenPorts {
    pub calls: Concurrency,
}

#[async_trait]
impl PortProber for EvenPorts {
    async fn probe(&self, _ip: Ipv4Addr, ports: &[u16], _t: Duration) -> Vec<OpenPort> {
        self.calls
            .track(async {
                ports
                    .iter()
                    .copied()
                    .filter(|port| port % 2 == 0)
                    .map(OpenPort::new)
                    .collect()
            })
            .await
    }
}

pub struct Doubles {
    pub discoverer: Arc<FakeDiscoverer>,
    pub names: Arc<CountingNames>,
    pub prober: Arc<EvenPorts>,
}

impl Doubles {
    pub fn new(discoverer: FakeDiscoverer) -> Self {
        Self {
            discoverer: Arc::new(discoverer),
            names: Arc::new(CountingNames::default()),
            prober: Arc::new(EvenPorts::default()),
        }
    }

    pub fn with_names(mut self, names: CountingNames) -> Self {
        self.names = Arc::new(names);
        self
    }

    pub fn service(&self) -> DiscoveryService {
        self.service_with(InterfaceSelection::Matched(ni(
            "eth0",
            2,
            Some(MacAddr::new(0x02, 0, 0, 0, 0, 1)),
            &[v4(192, 168, 1, 7, 24)],
            0,
        )))
    }

    pub fn service_with(&self, selection: InterfaceSelection) -> DiscoveryService {
        DiscoveryService::new(
            self.discoverer.clone(),
            Arc::new(AppleOnly),
            self.names.clone(),
            self.prober.clone(),
        )
        .with_interface_selector(Arc::new(move |_: &Subnet| selection.clone()))
    }
}
