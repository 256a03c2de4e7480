//! A **local area network (LAN)** discoverer.
//!
//! Broadcasts one ARP request per host address of the subnet and collects the
//! replies until every host has answered or the listen window closes.
//!
//! This needs **root privileges** (or `CAP_NET_RAW`) to open a raw Layer 2
//! channel on the selected interface.

use std::collections::HashSet;
use std::io;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pnet::datalink::NetworkInterface;
use pnet::util::MacAddr;
use tracing::{debug, trace};

use whodis_common::error::ScanError;
use whodis_common::network::subnet::Subnet;
use whodis_common::utils::interface::NetworkInterfaceExtension;
use whodis_protocols::arp;

use crate::network::channel::{self, ChannelOpener, EthernetHandle};

use super::{DiscoveredHost, HostDiscoverer};

pub struct ArpDiscoverer {
    opener: Arc<ChannelOpener>,
    /// Held by the blocking sweep for as long as its raw channel is open.
    link: Arc<Mutex<()>>,
}

impl Default for ArpDiscoverer {
    fn default() -> Self {
        Self::new()
    }
}

impl ArpDiscoverer {
    pub fn new() -> Self {
        Self::with_opener(Arc::new(channel::system_opener))
    }

    pub fn with_opener(opener: Arc<ChannelOpener>) -> Self {
        Self {
            opener,
            link: Arc::new(Mutex::new(())),
        }
    }
}

#[async_trait]
impl HostDiscoverer for ArpDiscoverer {
    async fn discover(
        &self,
        intf: NetworkInterface,
        subnet: Subnet,
        listen_for: Duration,
    ) -> Result<Vec<DiscoveredHost>, ScanError> {
        let opener = Arc::clone(&self.opener);
        let link = Arc::clone(&self.link);
        // An abandoned caller does not stop the sweep, so the next one waits here
        // rather than opening a second channel.
        tokio::task::spawn_blocking(move || {
            let _link = link.lock().unwrap_or_else(PoisonError::into_inner);
            sweep(&intf, &subnet, listen_for, opener.as_ref())
        })
        .await
        .map_err(|e| ScanError::Other(format!("discovery task failed: {e}")))?
    }
}

fn sweep(
    intf: &NetworkInterface,
    subnet: &Subnet,
    listen_for: Duration,
    opener: &ChannelOpener,
) -> Result<Vec<DiscoveredHost>, ScanError> {
    let src_mac: MacAddr = intf
        .mac
        .ok_or_else(|| ScanError::Transport(format!("{} has no MAC address", intf.name)))?;
    let src_addr: Ipv4Addr = intf
        .get_source_ipv4(subnet)
        .ok_or_else(|| ScanError::Transport(format!("{} has no IPv4 address", intf.name)))?;

    let frames: Vec<Vec<u8>> = arp::create_sweep(src_mac, src_addr, subnet)
        .map_err(|e| ScanError::Other(format!("building ARP sweep: {e:#}")))?;

    let mut handle: EthernetHandle =
        channel::open_eth_channel(intf, &channel::get_config(), |i, cfg| opener(i, cfg))?;

    for frame in &frames {
        match handle.tx.send_to(frame, None) {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                return Err(ScanError::Transport(format!("sending on {}: {e}", intf.name)));
            }
            None => {
                return Err(ScanError::Transport(format!(
                    "sending on {}: sender unavailable",
                    intf.name
                )));
            }
        }
    }
    debug!("sent {} ARP requests from {src_addr} on {}", frames.len(), intf.name);

    let mut collector = ReplyCollector::new(*subnet, src_addr);
    let deadline = Instant::now() + listen_for;
    while Instant::now() < deadline && !collector.is_complete() {
        match handle.rx.next() {
            Ok(frame) => {
                collector.ingest(frame);
            }
            Err(e) if is_idle_tick(&e) => {}
            Err(e) => {
                return Err(ScanError::Transport(format!("receiving on {}: {e}", intf.name)));
            }
        }
    }

    Ok(collector.finish())
}

/// Read-timeout expiry just means nothing arrived during one poll.
fn is_idle_tick(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Keeps the first reply per address in arrival order.
struct ReplyCollector {
    subnet: Subnet,
    local_addr: Ipv4Addr,
    seen_ips: HashSet<Ipv4Addr>,
    seen_macs: HashSet<MacAddr>,
    hosts: Vec<DiscoveredHost>,
    expected: usize,
}

impl ReplyCollector {
    fn new(subnet: Subnet, local_addr: Ipv4Addr) -> Self {
        let expected = subnet.hosts().filter(|addr| *addr != local_addr).count();
        Self {
            subnet,
            local_addr,
            seen_ips: HashSet::new(),
            seen_macs: HashSet::new(),
            hosts: Vec::new(),
            expected,
        }
    }

    /// Returns `true` when the frame added a new host.
    fn ingest(&mut self, frame: &[u8]) -> bool {
        let reply = match arp::get_reply(frame) {
            Ok(reply) => reply,
            Err(_) => return false,
        };

        if !self.is_candidate(reply.ip) {
            trace!("ignoring ARP reply from {} outside {}", reply.ip, self.subnet);
            return false;
        }
        // A proxying device answering for several addresses keeps its first one.
        if self.seen_ips.contains(&reply.ip) || self.seen_macs.contains(&reply.mac) {
            return false;
        }

        self.seen_ips.insert(reply.ip);
        self.seen_macs.insert(reply.mac);
        self.hosts.push(DiscoveredHost {
            ip: reply.ip,
            mac: reply.mac,
        });
        trace!("{} is at {}", reply.ip, reply.mac);
        true
    }

    fn is_candidate(&self, ip: Ipv4Addr) -> bool {
        self.subnet.contains(ip)
            && ip != self.local_addr
            && ip != self.subnet.network_addr()
            && ip != self.subnet.broadcast_addr()
    }

    fn is_complete(&self) -> bool {
        self.hosts.len() >= self.expected
    }

    fn finish(self) -> Vec<DiscoveredHost> {
        self.hosts
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pnet::datalink::{Channel, Config, DataLinkReceiver, DataLinkSender};
    use pnet::ipnetwork::{IpNetwork, Ipv4Network};
    use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, MutableArpPacket};
    use pnet::packet::ethernet::{EtherTypes, MutableEthernetPacket};
    use whodis_common::error::ErrorKind;

    const LOCAL_MAC: MacAddr = MacAddr(0x02, 0x00, 0x00, 0x00, 0x00, 0x01);
    const LISTEN: Duration = Duration::from_millis(200);

    #[derive(Clone)]
    enum Step {
        Frame(Vec<u8>),
        Fail(io::ErrorKind),
    }

    struct ScriptedSender {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        fail: bool,
    }

    impl DataLinkSender for ScriptedSender {
        fn build_and_send(
            &mut self,
            _num_packets: usize,
            _packet_size: usize,
            _func: &mut dyn FnMut(&mut [u8]),
        ) -> Option<io::Result<()>> {
            None
        }

        fn send_to(&mut self, packet: &[u8], _dst: Option<NetworkInterface>) -> Option<io::Result<()>> {
            if self.fail {
                return Some(Err(io::Error::new(io::ErrorKind::BrokenPipe, "link down")));
            }
            self.sent.lock().unwrap().push(packet.to_vec());
            Some(Ok(()))
        }
    }

    struct ScriptedReceiver {
        steps: VecDeque<Step>,
        current: Vec<u8>,
    }

    impl DataLinkReceiver for ScriptedReceiver {
        fn next(&mut self) -> io::Result<&[u8]> {
            match self.steps.pop_front() {
                Some(Step::Frame(frame)) => {
                    self.current = frame;
                    Ok(&self.current)
                }
                Some(Step::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
                None => {
                    std::thread::sleep(Duration::from_millis(5));
                    Err(io::Error::new(io::ErrorKind::TimedOut, "read timeout"))
                }
            }
        }
    }

    fn scripted_opener(
        steps: Vec<Step>,
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        fail_send: bool,
    ) -> Arc<ChannelOpener> {
        Arc::new(move |_: &NetworkInterface, _: Config| -> io::Result<Channel> {
            let tx = ScriptedSender {
                sent: Arc::clone(&sent),
                fail: fail_send,
            };
            let rx = ScriptedReceiver {
                steps: steps.clone().into(),
                current: Vec::new(),
            };
            Ok(Channel::Ethernet(Box::new(tx), Box::new(rx)))
        })
    }

    /// Raw channels currently open, and the most ever open at once.
    #[derive(Default)]
    struct OpenChannels {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    struct TrackedReceiver {
        channels: Arc<OpenChannels>,
    }

    impl DataLinkReceiver for TrackedReceiver {
        fn next(&mut self) -> io::Result<&[u8]> {
            std::thread::sleep(Duration::from_millis(5));
            Err(io::Error::new(io::ErrorKind::TimedOut, "read timeout"))
        }
    }

    impl Drop for TrackedReceiver {
        fn drop(&mut self) {
            self.channels.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn tracking_opener(channels: Arc<OpenChannels>) -> Arc<ChannelOpener> {
        Arc::new(move |_: &NetworkInterface, _: Config| -> io::Result<Channel> {
            let now = channels.current.fetch_add(1, Ordering::SeqCst) + 1;
            channels.peak.fetch_max(now, Ordering::SeqCst);
            let tx = ScriptedSender {
                sent: Arc::new(Mutex::new(Vec::new())),
                fail: false,
            };
            let rx = TrackedReceiver {
                channels: Arc::clone(&channels),
            };
            Ok(Channel::Ethernet(Box::new(tx), Box::new(rx)))
        })
    }

    fn mock_interface() -> NetworkInterface {
        NetworkInterface {
            name: "eth0".into(),
            description: "".into(),
            index: 2,
            mac: Some(LOCAL_MAC),
            ips: vec![IpNetwork::V4(
                Ipv4Network::new(Ipv4Addr::new(10, 0, 5, 7), 24).unwrap(),
            )],
            flags: 0,
        }
    }

    fn subnet() -> Subnet {
        "10.0.5.0/24".parse().unwrap()
    }

    fn reply_frame(ip: Ipv4Addr, mac: MacAddr) -> Vec<u8> {
        let mut buffer = vec![0u8; 60];
        {
            let mut eth = MutableEthernetPacket::new(&mut buffer).unwrap();
            eth.set_destination(LOCAL_MAC);
            eth.set_source(mac);
            eth.set_ethertype(EtherTypes::Arp);
        }
        let mut arp_pkt = MutableArpPacket::new(&mut buffer[14..42]).unwrap();
        arp_pkt.set_hardware_type(ArpHardwareTypes::Ethernet);
        arp_pkt.set_protocol_type(EtherTypes::Ipv4);
        arp_pkt.set_hw_addr_len(6);
        arp_pkt.set_proto_addr_len(4);
        arp_pkt.set_operation(ArpOperations::Reply);
        arp_pkt.set_sender_hw_addr(mac);
        arp_pkt.set_sender_proto_addr(ip);
        arp_pkt.set_target_hw_addr(LOCAL_MAC);
        arp_pkt.set_target_proto_addr(Ipv4Addr::new(10, 0, 5, 7));
        buffer
    }

    fn host(last: u8) -> (Ipv4Addr, MacAddr) {
        (Ipv4Addr::new(10, 0, 5, last), MacAddr::new(0xaa, 0, 0, 0, 0, last))
    }

    #[tokio::test]
    async fn replies_are_reported_in_arrival_order() {
        let (ip_a, mac_a) = host(1);
        let (ip_b, mac_b) = host(42);
        let (ip_c, mac_c) = host(9);
        let sent = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![
            Step::Frame(reply_frame(ip_b, mac_b)),
            Step::Fail(io::ErrorKind::TimedOut),
            Step::Frame(reply_frame(ip_a, mac_a)),
            Step::Frame(reply_frame(ip_c, mac_c)),
        ];

        let discoverer = ArpDiscoverer::with_opener(scripted_opener(steps, Arc::clone(&sent), false));
        let hosts = discoverer.discover(mock_interface(), subnet(), LISTEN).await.unwrap();

        let ips: Vec<Ipv4Addr> = hosts.iter().map(|h| h.ip).collect();
        assert_eq!(ips, vec![ip_b, ip_a, ip_c]);
        assert_eq!(hosts[0].mac, mac_b);
        assert_eq!(sent.lock().unwrap().len(), 253);
    }

    #[tokio::test]
    async fn duplicates_and_foreign_frames_are_ignored() {
        let (ip_a, mac_a) = host(1);
        let (ip_b, _) = host(2);
        let request = arp::create_request(mac_a, ip_a, Ipv4Addr::new(10, 0, 5, 7)).unwrap();
        let steps = vec![
            Step::Frame(reply_frame(ip_a, mac_a)),
            Step::Frame(reply_frame(ip_a, MacAddr::new(0xbb, 0, 0, 0, 0, 1))),
            Step::Frame(reply_frame(ip_b, mac_a)),
            Step::Frame(reply_frame(Ipv4Addr::new(192, 168, 1, 1), MacAddr::new(0xcc, 0, 0, 0, 0, 1))),
            Step::Frame(reply_frame(Ipv4Addr::new(10, 0, 5, 7), MacAddr::new(0xdd, 0, 0, 0, 0, 1))),
            Step::Frame(request),
            Step::Frame(vec![0u8; 8]),
        ];

        let discoverer =
            ArpDiscoverer::with_opener(scripted_opener(steps, Arc::new(Mutex::new(Vec::new())), false));
        let hosts = discoverer.discover(mock_interface(), subnet(), LISTEN).await.unwrap();

        assert_eq!(hosts, vec![DiscoveredHost { ip: ip_a, mac: mac_a }]);
    }

    #[tokio::test]
    async fn silence_yields_empty_result() {
        let discoverer =
            ArpDiscoverer::with_opener(scripted_opener(vec![], Arc::new(Mutex::new(Vec::new())), false));
        let hosts = discoverer.discover(mock_interface(), subnet(), LISTEN).await.unwrap();
        assert!(hosts.is_empty());
    }

    #[tokio::test]
    async fn denied_channel_is_a_permission_error() {
        let opener: Arc<ChannelOpener> = Arc::new(|_: &NetworkInterface, _: Config| -> io::Result<Channel> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "Operation not permitted"))
        });
        let err = ArpDiscoverer::with_opener(opener)
            .discover(mock_interface(), subnet(), LISTEN)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[tokio::test]
    async fn send_failure_is_a_transport_error() {
        let discoverer =
            ArpDiscoverer::with_opener(scripted_opener(vec![], Arc::new(Mutex::new(Vec::new())), true));
        let err = discoverer.discover(mock_interface(), subnet(), LISTEN).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("link down"));
    }

    #[tokio::test]
    async fn receive_failure_is_a_transport_error() {
        let steps = vec![Step::Fail(io::ErrorKind::ConnectionAborted)];
        let discoverer =
            ArpDiscoverer::with_opener(scripted_opener(steps, Arc::new(Mutex::new(Vec::new())), false));
        let err = discoverer.discover(mock_interface(), subnet(), LISTEN).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn interface_without_mac_cannot_sweep() {
        let mut intf = mock_interface();
        intf.mac = None;
        let discoverer =
            ArpDiscoverer::with_opener(scripted_opener(vec![], Arc::new(Mutex::new(Vec::new())), false));
        let err = discoverer.discover(intf, subnet(), LISTEN).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn abandoned_sweep_keeps_the_link_until_it_ends() {
        let channels = Arc::new(OpenChannels::default());
        let discoverer = ArpDiscoverer::with_opener(tracking_opener(Arc::clone(&channels)));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            discoverer.discover(mock_interface(), subnet(), Duration::from_millis(300)),
        )
        .await;
        assert!(abandoned.is_err());

        let hosts = discoverer
            .discover(mock_interface(), subnet(), Duration::from_millis(100))
            .await
            .unwrap();

        assert!(hosts.is_empty());
        assert_eq!(channels.peak.load(Ordering::SeqCst), 1);
        assert_eq!(channels.current.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn collector_completes_once_every_host_answered() {
        let local = Ipv4Addr::new(10, 0, 5, 7);
        let mut collector = ReplyCollector::new(subnet(), local);
        for last in 1..=254u8 {
            let (ip, mac) = host(last);
            collector.ingest(&reply_frame(ip, mac));
        }
        assert!(collector.is_complete());
        assert_eq!(collector.finish().len(), 253);
    }

    #[test]
    fn idle_ticks_are_not_failures() {
        assert!(is_idle_tick(&io::Error::new(io::ErrorKind::TimedOut, "t")));
        assert!(is_idle_tick(&io::Error::new(io::ErrorKind::WouldBlock, "w")));
        assert!(!is_idle_tick(&io::Error::new(io::ErrorKind::NetworkDown, "n")));
    }
}
