use pnet::datalink::{self, NetworkInterface};

use whodis_common::network::interface;
use whodis_common::network::subnet::Subnet;
use whodis_common::warn;

use crate::terminal::network_fmt;
use crate::wprint;

pub fn interfaces(target: Option<Subnet>) -> anyhow::Result<()> {
    let interfaces: Vec<NetworkInterface> = datalink::interfaces();
    if interfaces.is_empty() {
        anyhow::bail!("no network interfaces found");
    }

    let subnet: Option<Subnet> =
        target.or_else(|| interface::local_ipv4_addr().map(Subnet::containing));
    let default_name: Option<String> = subnet
        .and_then(|subnet| interface::select_interface(&subnet).into_interface())
        .map(|intf| intf.name);
    if default_name.is_none() {
        warn!("No interface would be used for a scan");
    }

    for (idx, intf) in interfaces.iter().enumerate() {
        let is_default = default_name.as_deref() == Some(intf.name.as_str());
        network_fmt::print_interface(intf, idx, is_default);
        if idx + 1 != interfaces.len() {
            wprint!();
        }
    }
    Ok(())
}
