//! Error types for Usbwatch core operations.

use thiserror::Error;

use crate::monitor::MonitorState;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Usbwatch core operations.
///
/// A lookup miss is not represented here: `device_by_letter` returns
/// `Ok(None)` for a designator with no mounted device, because a miss is
/// a normal outcome rather than an exceptional one.
#[derive(Debug, Error)]
pub enum Error {
    /// Systemic failure to query the OS device tree, e.g. permission
    /// denial or an unavailable subsystem. Transient during monitoring:
    /// the listener retries on the next notification.
    #[error("Device enumeration failed: {0}")]
    Enumeration(String),

    /// `start` was called while a monitoring session is active or being
    /// set up.
    #[error("Monitoring is already running")]
    AlreadyRunning,

    /// `stop` was called with no monitoring session active.
    #[error("Monitoring is not running")]
    NotRunning,

    /// `stop` was called during a transient lifecycle transition; the
    /// call is rejected rather than queued.
    #[error("Monitor is busy ({0})")]
    Busy(MonitorState),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
