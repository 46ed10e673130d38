//! Error types for hot-plug sources

use thiserror::Error;

/// Errors that can occur while reading hot-plug notifications
#[derive(Debug, Error)]
pub enum HotplugError {
    /// I/O error talking to the notification source
    #[error("hot-plug I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The notification source is not available on this host
    #[error("hot-plug source unavailable: {0}")]
    Unavailable(String),
}
