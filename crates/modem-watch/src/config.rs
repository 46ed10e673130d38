//! Monitor configuration

use std::time::Duration;

use modem_at::RetrieverConfig;

/// Timing and serial settings for the event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Pause between polls when no hot-plug event is pending
    pub poll_interval: Duration,
    /// Wait after a command port appears before talking to it
    ///
    /// Gives the kernel time to make the device node writable. Applied on
    /// `add` only, never on `change`.
    pub settle_delay: Duration,
    /// Serial settings for identifier retrieval
    pub retriever: RetrieverConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            settle_delay: Duration::from_secs(5),
            retriever: RetrieverConfig::default(),
        }
    }
}
