//! Error types for the modem manager

use modem_hotplug::HotplugError;
use thiserror::Error;

/// Errors reported to callers of the [`Manager`](crate::Manager)
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Monitoring is already running
    #[error("monitor is already started")]
    AlreadyMonitoring,

    /// Monitoring is not running
    #[error("monitor is not running")]
    NotMonitoring,

    /// The hot-plug source could not be opened
    #[error("failed to open hot-plug source: {0}")]
    Source(#[from] HotplugError),

    /// The worker thread or its runtime could not be started
    #[error("failed to start monitor worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// The worker exited before reporting that it was ready
    #[error("monitor worker exited during startup")]
    WorkerExited,
}
