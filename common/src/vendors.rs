use std::str::FromStr;

use pnet::util::MacAddr;

/// Reported when a MAC address cannot be attributed to a manufacturer.
pub const UNKNOWN_VENDOR: &str = "Unknown Vendor";

/// Defines the contract for resolving device manufacturers from MAC addresses.
///
/// Implementations are shared read-only across concurrent scans.
pub trait VendorRepository: Send + Sync {
    /// Retrieves the vendor name for a given MAC address.
    ///
    /// # Returns
    /// * `Some(String)` - The name of the vendor if found.
    /// * `None` - If the OUI is unknown.
    fn get_vendor(&self, mac_addr: MacAddr) -> Option<String>;

    /// Vendor name for `mac_addr`, falling back to [`UNKNOWN_VENDOR`].
    fn vendor_or_unknown(&self, mac_addr: MacAddr) -> String {
        self.get_vendor(mac_addr)
            .unwrap_or_else(|| UNKNOWN_VENDOR.to_string())
    }

    /// Same as [`VendorRepository::vendor_or_unknown`] for unparsed input.
    fn vendor_for_str(&self, mac_addr: &str) -> String {
        match MacAddr::from_str(mac_addr.trim()) {
            Ok(mac) => self.vendor_or_unknown(mac),
            Err(_) => UNKNOWN_VENDOR.to_string(),
        }
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
