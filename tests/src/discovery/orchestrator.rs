use std::net::Ipv4Addr;
use std::time::Duration;

use whodis_common::config::ScanConfig;
use whodis_common::error::ErrorKind;
use whodis_common::network::interface::InterfaceSelection;
use whodis_common::vendors::UNKNOWN_VENDOR;
use whodis_core::discovery::{ScanOutcome, ScanPhase};

use crate::utils::{host, lan, ni, v4, CountingNames, Doubles, FakeDiscoverer};

fn quick() -> ScanConfig {
    ScanConfig::default().with_subnet(Some(lan()))
}

#[tokio::test]
async fn permission_failure_yields_single_descriptor() {
    let doubles = Doubles::new(FakeDiscoverer::denied());
    let service = doubles.service();

    let outcome = service.scan(&quick()).await;

    let err = outcome.error().expect("scan must fail");
    assert_eq!(err.kind, ErrorKind::Permission);
    assert!(err.message.contains("Operation not permitted"));
    assert!(outcome.devices().is_empty());
    assert_eq!(service.phase(), ScanPhase::Error);
    assert_eq!(doubles.names.calls.total(), 0);
}

#[tokio::test]
async fn quick_scan_never_probes_ports() {
    let doubles = Doubles::new(FakeDiscoverer::finding(vec![host(1), host(2)]));
    let outcome = doubles.service().scan(&quick()).await;

    assert_eq!(outcome.devices().len(), 2);
    assert!(outcome.devices().iter().all(|d| d.ports.is_empty()));
    assert_eq!(doubles.prober.calls.total(), 0);
}

#[tokio::test]
async fn deep_scan_reports_open_ports_in_candidate_order() {
    let doubles = Doubles::new(FakeDiscoverer::finding(vec![host(1)]));
    let cfg = quick().with_deep_scan(true).with_ports(vec![8080, 22, 443, 80]);

    let outcome = doubles.service().scan(&cfg).await;

    let ports: Vec<(u16, &str)> = outcome.devices()[0]
        .ports
        .iter()
        .map(|p| (p.port, p.service.as_str()))
        .collect();
    assert_eq!(ports, vec![(8080, "HTTP-Proxy"), (22, "SSH"), (80, "HTTP")]);
}

#[tokio::test]
async fn records_follow_discovery_order() {
    // Lower addresses finish enrichment last.
    let order = vec![host(42), host(1), host(200), host(9)];
    let doubles = Doubles::new(FakeDiscoverer::finding(order.clone()));

    let outcome = doubles.service().scan(&quick()).await;

    let ips: Vec<Ipv4Addr> = outcome.devices().iter().map(|d| d.ip).collect();
    let expected: Vec<Ipv4Addr> = order.iter().map(|h| h.ip).collect();
    assert_eq!(ips, expected);
}

#[tokio::test]
async fn enrichment_fills_vendor_and_hostname() {
    let mut foreign = host(3);
    foreign.mac = pnet::datalink::MacAddr::new(0x00, 0x11, 0x22, 0x33, 0x44, 0x55);
    let names = CountingNames {
        unnamed: vec![foreign.ip],
        ..CountingNames::default()
    };
    let doubles = Doubles::new(FakeDiscoverer::finding(vec![host(1), foreign])).with_names(names);

    let outcome = doubles.service().scan(&quick()).await;
    let devices = outcome.devices();

    assert_eq!(devices[0].vendor, "Apple, Inc.");
    assert!(devices[0].hostname.as_deref().unwrap().starts_with("host-1-"));
    assert_eq!(devices[1].vendor, UNKNOWN_VENDOR);
    assert_eq!(devices[1].hostname, None);
}

#[tokio::test]
async fn empty_sweep_is_not_an_error() {
    let doubles = Doubles::new(FakeDiscoverer::finding(vec![]));
    let service = doubles.service();

    assert_eq!(service.scan(&quick()).await, ScanOutcome::NoHosts);
    assert_eq!(service.phase(), ScanPhase::Done);
}

#[tokio::test]
async fn repeated_scans_enrich_afresh() {
    let doubles = Doubles::new(FakeDiscoverer::finding(vec![host(1), host(2)]));
    let service = doubles.service();

    let first = service.scan(&quick()).await;
    let second = service.scan(&quick()).await;

    assert_eq!(first.devices().len(), second.devices().len());
    for (a, b) in first.devices().iter().zip(second.devices()) {
        assert_eq!((a.ip, a.mac, &a.vendor), (b.ip, b.mac, &b.vendor));
        assert_ne!(a.hostname, b.hostname, "hostnames must be looked up again");
    }
    assert_eq!(doubles.names.calls.total(), 4);
}

#[tokio::test]
async fn concurrent_scans_run_one_at_a_time() {
    let mut discoverer = FakeDiscoverer::finding(vec![host(1)]);
    discoverer.delay = Duration::from_millis(50);
    let doubles = Doubles::new(discoverer);
    let service = doubles.service();
    let cfg = quick();

    let (a, b) = tokio::join!(service.scan(&cfg), service.scan(&cfg));

    assert_eq!(a.devices().len(), 1);
    assert_eq!(b.devices().len(), 1);
    assert_eq!(doubles.discoverer.calls.total(), 2);
    assert_eq!(doubles.discoverer.calls.peak(), 1);
}

#[tokio::test]
async fn enrichment_respects_worker_bound() {
    let hosts = (1..=12).map(host).collect();
    let doubles = Doubles::new(FakeDiscoverer::finding(hosts));
    let mut cfg = quick();
    cfg.enrich_workers = 3;

    let outcome = doubles.service().scan(&cfg).await;

    assert_eq!(outcome.devices().len(), 12);
    assert!(doubles.names.calls.peak() <= 3);
}

#[tokio::test]
async fn fallback_interface_still_scans() {
    let doubles = Doubles::new(FakeDiscoverer::finding(vec![host(1)]));
    let fallback = InterfaceSelection::Fallback(ni("wlan0", 3, None, &[v4(10, 0, 0, 5, 24)], 0));

    let outcome = doubles.service_with(fallback).scan(&quick()).await;

    assert_eq!(outcome.devices().len(), 1);
}

#[tokio::test]
async fn no_interface_is_a_transport_failure() {
    let doubles = Doubles::new(FakeDiscoverer::finding(vec![host(1)]));
    let service = doubles.service_with(InterfaceSelection::Unavailable);

    let outcome = service.scan(&quick()).await;

    assert_eq!(outcome.error().map(|e| e.kind), Some(ErrorKind::Transport));
    assert_eq!(doubles.discoverer.calls.total(), 0);
}

#[tokio::test]
async fn subscribers_see_the_final_phase() {
    let doubles = Doubles::new(FakeDiscoverer::finding(vec![host(1)]));
    let service = doubles.service();
    let phases = service.subscribe();
    assert_eq!(*phases.borrow(), ScanPhase::Idle);

    service.scan(&quick()).await;

    assert_eq!(*phases.borrow(), ScanPhase::Done);
}

#[tokio::test]
async fn devices_serialize_for_collaborators() {
    let doubles = Doubles::new(FakeDiscoverer::finding(vec![host(1)]));
    let cfg = quick().with_deep_scan(true).with_ports(vec![22]);

    let outcome = doubles.service().scan(&cfg).await;
    let json = serde_json::to_value(outcome.devices()).unwrap();

    assert_eq!(json[0]["ip"], "192.168.1.1");
    assert_eq!(json[0]["mac"], "3c:22:fb:00:00:01");
    assert_eq!(json[0]["vendor"], "Apple, Inc.");
    assert_eq!(json[0]["ports"], serde_json::json!([{ "port": 22, "service": "SSH" }]));
    assert!(json[0]["hostname"].is_string());
}
