//! # WhoDis Core
//!
//! The discovery and enrichment engine.
//!
//! * **[`discovery`]**: the scan orchestrator, [`discovery::DiscoveryService`].
//! * **[`scanner`]**: the ARP sweep and hostname resolution.
//! * **[`network`]**: raw channels and TCP port probing.
//! * **[`vendors`]**: the OUI-backed vendor table.

pub mod discovery;
pub mod network;
pub mod scanner;
pub mod vendors;
