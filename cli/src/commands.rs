pub mod discover;
pub mod interfaces;

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use whodis_common::config::{
    DEFAULT_DISCOVERY_TIMEOUT, DEFAULT_PORT_TIMEOUT, DEFAULT_PORTS, ScanConfig,
};
use whodis_common::network::subnet::Subnet;

const DEFAULT_TIMEOUT_MS: u64 = DEFAULT_DISCOVERY_TIMEOUT.as_millis() as u64;
const DEFAULT_PORT_TIMEOUT_MS: u64 = DEFAULT_PORT_TIMEOUT.as_millis() as u64;

#[derive(Parser)]
#[command(name = "whodis")]
#[command(version, about = "Find out who is on your local network.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Only print results, warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover the devices on a /24 subnet
    #[command(alias = "d")]
    Discover(DiscoverArgs),
    /// Show the network interfaces of this device
    #[command(alias = "i")]
    Interfaces {
        /// Mark the interface a scan of this subnet would use [default: the local subnet]
        target: Option<Subnet>,
    },
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Subnet to sweep, e.g. 192.168.1.0/24 [default: the local subnet]
    pub target: Option<Subnet>,

    /// Also probe common TCP ports on every device
    #[arg(long)]
    pub deep: bool,

    /// Print the result as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// How long to collect ARP replies, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout: u64,

    /// Connect timeout per probed port, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_PORT_TIMEOUT_MS)]
    pub port_timeout: u64,

    /// Ports probed by --deep, comma separated [default: 22,80,443,445,3389,8080]
    #[arg(long, value_name = "PORTS", value_delimiter = ',')]
    pub ports: Option<Vec<u16>>,

    /// Use the cached or built-in vendor table without downloading a fresh one
    #[arg(long)]
    pub no_refresh: bool,
}

impl DiscoverArgs {
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig::default()
            .with_subnet(self.target)
            .with_deep_scan(self.deep)
            .with_discovery_timeout(Duration::from_millis(self.timeout))
            .with_port_timeout(Duration::from_millis(self.port_timeout))
            .with_ports(self.ports.clone().unwrap_or_else(|| DEFAULT_PORTS.to_vec()))
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
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
