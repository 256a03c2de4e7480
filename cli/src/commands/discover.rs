use std::time::{Duration, Instant};

use anyhow::bail;
use colored::*;
use tracing::{Instrument, info_span};

use whodis_common::config::{ScanConfig, VendorConfig};
use whodis_common::error::{ErrorDescriptor, ErrorKind};
use whodis_common::network::device::DeviceRecord;
use whodis_common::{success, warn};
use whodis_core::discovery::{DiscoveryService, ScanOutcome};
use whodis_core::vendors::TableRefresh;

use crate::commands::DiscoverArgs;
use crate::terminal::{colors, format, print, spinner};
use crate::wprint;

pub async fn discover(args: DiscoverArgs, quiet: bool) -> anyhow::Result<()> {
    let scan_cfg: ScanConfig = args.scan_config();
    let vendor_cfg = VendorConfig {
        refresh: !args.no_refresh,
        ..VendorConfig::default()
    };

    if !args.json {
        print::header("getting ready for discovery", quiet);
    }
    let (service, refresh) = DiscoveryService::bootstrap(&vendor_cfg, scan_cfg.clone()).await;
    if let Some(notice) = refresh_notice(&refresh) {
        warn!("{notice}");
    }

    let start_time: Instant = Instant::now();
    let outcome: ScanOutcome = if args.json {
        service.scan(&scan_cfg).await
    } else {
        let span = info_span!("discovery");
        let follower = spinner::follow_phases(span.clone(), service.subscribe());
        let outcome = service.scan(&scan_cfg).instrument(span).await;
        let _ = follower.await;
        outcome
    };

    if args.json {
        return print_json(&outcome);
    }

    match outcome {
        ScanOutcome::Found(devices) => {
            discovery_ends(&devices, start_time.elapsed(), quiet);
            Ok(())
        }
        ScanOutcome::NoHosts => {
            no_hosts_found(quiet);
            Ok(())
        }
        ScanOutcome::Failed(err) => scan_failed(err),
    }
}

fn print_json(outcome: &ScanOutcome) -> anyhow::Result<()> {
    match outcome.error() {
        None => {
            println!("{}", serde_json::to_string_pretty(outcome.devices())?);
            Ok(())
        }
        Some(err) => {
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "error": err }))?);
            bail!("{err}")
        }
    }
}

/// Vendors may be stale when the table could not be refreshed.
fn refresh_notice(refresh: &TableRefresh) -> Option<String> {
    match refresh {
        TableRefresh::Failed { reason } => Some(format!(
            "Vendor table not refreshed, using the previous table: {reason}"
        )),
        TableRefresh::Refreshed { .. } | TableRefresh::Skipped => None,
    }
}

fn scan_failed(err: ErrorDescriptor) -> anyhow::Result<()> {
    if err.kind == ErrorKind::Permission && !is_root::is_root() {
        warn!("Raw network access needs elevated privileges, try again with sudo");
    }
    bail!("{err}")
}

fn discovery_ends(devices: &[DeviceRecord], total_time: Duration, quiet: bool) {
    if quiet {
        wprint!();
    }

    print::header("Network Discovery", quiet);
    print_devices(devices);
    print_summary(devices.len(), total_time, quiet);
}

fn no_hosts_found(quiet: bool) {
    print::header("ZERO HOSTS DETECTED", quiet);
    print::no_results();
}

fn print_devices(devices: &[DeviceRecord]) {
    for (idx, device) in devices.iter().enumerate() {
        let name = device.hostname.as_deref().unwrap_or("No hostname");
        print::tree_head(idx, name);
        print::as_tree_one_level(format::device_details(device));
        if idx + 1 != devices.len() {
            wprint!();
        }
    }
}

fn print_summary(device_count: usize, total_time: Duration, quiet: bool) {
    let active: ColoredString = format!("{device_count} devices").bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: &ColoredString =
        &format!("Discovery Complete: {active} identified in {total_time}").color(colors::TEXT_DEFAULT);

    if quiet {
        wprint!();
        success!("{}", output);
    } else {
        print::fat_separator();
        print::centerln(output);
        print::end_of_program();
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
