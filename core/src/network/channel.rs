use std::io;
use std::time::Duration;

use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};

use whodis_common::error::ScanError;

/// Poll interval of the receive loop. Expiry is a tick, not a failure.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Anything that can open a link-layer channel the way [`datalink::channel`] does.
pub type ChannelOpener =
    dyn Fn(&NetworkInterface, Config) -> io::Result<Channel> + Send + Sync;

pub struct EthernetHandle {
    pub tx: Box<dyn DataLinkSender>,
    pub rx: Box<dyn DataLinkReceiver>,
}

pub fn open_eth_channel<F>(
    intf: &NetworkInterface,
    cfg: &Config,
    channel_opener: F,
) -> Result<EthernetHandle, ScanError>
where
    F: FnOnce(&NetworkInterface, Config) -> io::Result<Channel>,
{
    let context = format!("opening on {}", intf.name);
    let ch: Channel =
        channel_opener(intf, *cfg).map_err(|e| ScanError::from_channel_io(&e, &context))?;
    match ch {
        Channel::Ethernet(tx, rx) => Ok(EthernetHandle { tx, rx }),
        _ => Err(ScanError::Transport(format!(
            "non-ethernet channel for {}",
            intf.name
        ))),
    }
}

/// Opens the real channel of `intf`.
pub fn system_opener(intf: &NetworkInterface, cfg: Config) -> io::Result<Channel> {
    datalink::channel(intf, cfg)
}

pub fn get_config() -> Config {
    Config {
        read_timeout: Some(READ_TIMEOUT),
        ..Default::default()
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
