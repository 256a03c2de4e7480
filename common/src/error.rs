//! # Scan Errors
//!
//! Only the discovery phase can abort a scan. Everything that goes wrong while
//! enriching a host degrades a single field instead and never reaches this type.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Discriminant callers branch on. Never parse [`ScanError`] messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The raw link-layer channel could not be opened for lack of privilege.
    Permission,
    /// Sending or receiving on the link-layer channel failed.
    Transport,
    /// Anything else that stopped the discovery phase.
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Permission => "permission",
            ErrorKind::Transport => "transport",
            ErrorKind::Other => "other",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("scan failed: {0}")]
    Other(String),
}

impl ScanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScanError::Permission(_) => ErrorKind::Permission,
            ScanError::Transport(_) => ErrorKind::Transport,
            ScanError::Other(_) => ErrorKind::Other,
        }
    }

    /// Maps an I/O failure raised while opening the raw channel.
    pub fn from_channel_io(err: &std::io::Error, context: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                ScanError::Permission(format!("{context}: {err}"))
            }
            _ => ScanError::Transport(format!("{context}: {err}")),
        }
    }
}

/// The single error value handed to collaborators when a scan aborts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<ScanError> for ErrorDescriptor {
    fn from(err: ScanError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
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
