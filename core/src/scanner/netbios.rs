//! NetBIOS node status queries through the platform's own tooling.

use std::env;
use std::net::Ipv4Addr;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetbiosTool {
    /// `nbtstat -A <ip>`, shipped with Windows.
    Nbtstat,
    /// `nmblookup -A <ip>` from Samba.
    Nmblookup,
}

impl NetbiosTool {
    /// The tool usable on this host, if any. Probed once at startup.
    pub fn detect() -> Option<Self> {
        if cfg!(windows) {
            Some(NetbiosTool::Nbtstat)
        } else if is_on_path("nmblookup") {
            Some(NetbiosTool::Nmblookup)
        } else {
            None
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            NetbiosTool::Nbtstat => "nbtstat",
            NetbiosTool::Nmblookup => "nmblookup",
        }
    }

    pub fn args(&self, ip: Ipv4Addr) -> Vec<String> {
        vec!["-A".to_string(), ip.to_string()]
    }

    /// Name of the first unique `<00>` record in the tool's output.
    pub fn parse_name(&self, output: &str) -> Option<String> {
        output
            .lines()
            .filter(|line| line.contains("<00>"))
            .find(|line| self.is_unique_record(line))
            .and_then(|line| line.split_whitespace().next())
            .map(str::to_string)
    }

    fn is_unique_record(&self, line: &str) -> bool {
        match self {
            NetbiosTool::Nbtstat => line.contains("UNIQUE"),
            NetbiosTool::Nmblookup => !line.contains("<GROUP>"),
        }
    }
}

fn is_on_path(program: &str) -> bool {
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| is_file(&dir.join(program))))
        .unwrap_or(false)
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|meta| meta.is_file()).unwrap_or(false)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
