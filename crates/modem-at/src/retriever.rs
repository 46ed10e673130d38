//! Hardware identifier retrieval
//!
//! Opens a modem's command interface, sends the serial-number query and
//! parses the fixed-width reply. Each failure is reported once; retrying is
//! left to the caller.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, trace};

use crate::command::{parse_identifier_reply, AtCommand};
use crate::error::AtError;

/// Size of the buffer the reply is read into
const REPLY_BUFFER_LEN: usize = 128;

/// Something that can look up a modem's hardware identifier by port path
#[async_trait]
pub trait IdentifierRetriever: Send + Sync {
    /// Retrieve the hardware identifier of the modem behind `port`
    async fn retrieve_id(&self, port: &str) -> Result<String, AtError>;
}

/// Serial settings used for the identifier exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieverConfig {
    /// Baud rate
    pub baud_rate: u32,
    /// Timeout for each individual read
    pub read_timeout: Duration,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            read_timeout: Duration::from_millis(10),
        }
    }
}

/// Retrieves identifiers over a real serial port
#[derive(Debug, Clone, Default)]
pub struct SerialIdentifierRetriever {
    config: RetrieverConfig,
}

impl SerialIdentifierRetriever {
    /// Create a retriever with default serial settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a retriever with custom serial settings
    pub fn with_config(config: RetrieverConfig) -> Self {
        Self { config }
    }

    /// Serial settings in use
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }
}

#[async_trait]
impl IdentifierRetriever for SerialIdentifierRetriever {
    async fn retrieve_id(&self, port: &str) -> Result<String, AtError> {
        debug!("Opening {} at {} baud", port, self.config.baud_rate);

        let mut stream = tokio_serial::new(port, self.config.baud_rate)
            .timeout(self.config.read_timeout)
            .open_native_async()
            .map_err(|source| AtError::Open {
                port: port.to_string(),
                source,
            })?;

        query_identifier(&mut stream, port, self.config.read_timeout).await
    }
}

/// Run the serial-number exchange over an already open stream
///
/// The first read is the modem echoing the command line and is discarded
/// whatever its outcome. The second read must carry the full reply.
pub async fn query_identifier<S>(
    stream: &mut S,
    port: &str,
    read_timeout: Duration,
) -> Result<String, AtError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let command = AtCommand::ReadSerialNumber.encode();
    trace!("Sending {} to {}", AtCommand::ReadSerialNumber.as_str(), port);

    let write_err = |source| AtError::Write {
        port: port.to_string(),
        source,
    };
    stream.write_all(&command).await.map_err(write_err)?;
    stream.flush().await.map_err(write_err)?;

    let mut buf = [0u8; REPLY_BUFFER_LEN];

    match timeout(read_timeout, stream.read(&mut buf)).await {
        Ok(Ok(n)) => trace!(
            "Discarding echo from {}: {:?}",
            port,
            String::from_utf8_lossy(&buf[..n])
        ),
        Ok(Err(e)) => trace!("Echo read error on {}: {}", port, e),
        Err(_) => trace!("Echo read timeout on {}", port),
    }

    let n = match timeout(read_timeout, stream.read(&mut buf)).await {
        Ok(Ok(n)) => n,
        Ok(Err(source)) => {
            return Err(AtError::Read {
                port: port.to_string(),
                source,
            })
        }
        Err(_) => {
            return Err(AtError::Read {
                port: port.to_string(),
                source: io::Error::new(io::ErrorKind::TimedOut, "no reply within read timeout"),
            })
        }
    };

    let reply = &buf[..n];
    trace!("Reply from {}: {:?}", port, String::from_utf8_lossy(reply));
    parse_identifier_reply(reply)
}
