//! # WhoDis Common
//!
//! Shared vocabulary for the discovery engine and its drivers.
//!
//! * **[`network`]**: subnets, device records and local interface selection.
//! * **[`vendors`]**: the contract for resolving hardware vendors.
//! * **[`config`]**: per-scan configuration.
//! * **[`error`]**: the fatal error taxonomy surfaced to callers.

pub mod config;
pub mod error;
pub mod logging;
pub mod network;
pub mod utils;
pub mod vendors;

#[doc(hidden)]
pub use tracing;
