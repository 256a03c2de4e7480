//! Logging macros shared by every crate in the workspace.
//!
//! These forward to [`tracing`] under fixed targets so the terminal formatter
//! can pick a prefix without inspecting message text.

pub const SUCCESS_TARGET: &str = "whodis::success";

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::tracing::info!(target: "whodis::success", $($arg)*)
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::tracing::info!(target: "whodis", $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::tracing::warn!(target: "whodis", $($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::tracing::error!(target: "whodis", $($arg)*)
    };
}
