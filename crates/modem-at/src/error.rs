//! Error types for modem identification

use thiserror::Error;

/// Errors that can occur while retrieving a hardware identifier
#[derive(Debug, Error)]
pub enum AtError {
    /// Failed to open the serial port
    #[error("failed to open port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// Failed to write the command to the port
    #[error("failed to write command to {port}: {source}")]
    Write {
        port: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read the reply from the port
    #[error("failed to read reply from {port}: {source}")]
    Read {
        port: String,
        #[source]
        source: std::io::Error,
    },

    /// Reply too short or empty to carry an identifier
    #[error("invalid identifier: {len} byte reply")]
    InvalidIdentifier { len: usize },
}

impl AtError {
    /// Check if this error came from the serial transport rather than the reply contents
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AtError::Open { .. } | AtError::Write { .. } | AtError::Read { .. }
        )
    }
}
