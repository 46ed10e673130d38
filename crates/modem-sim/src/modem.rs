//! Virtual modem simulation
//!
//! Provides an in-memory serial port that behaves like the AT command
//! interface of a USB modem: it echoes command lines and answers the
//! serial-number query.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use modem_at::AtCommand;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::trace;

/// How a virtual modem answers the serial-number query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModemResponse {
    /// Reply with a well-formed frame carrying this identifier
    Identifier(String),
    /// Reply with these exact bytes
    Raw(Vec<u8>),
    /// Echo the command but never reply
    Silent,
}

impl ModemResponse {
    /// Build the serial-number reply frame for a 15-digit IMEI
    ///
    /// Layout: blank line, identifier line, blank line, `OK` line.
    pub fn frame(identifier: &str) -> Vec<u8> {
        format!("\r\n{}\r\n\r\nOK\r\n", identifier).into_bytes()
    }
}

/// A simulated modem command interface
///
/// Each chunk the modem emits is handed out by exactly one read, the way a
/// serial driver delivers the echo and the reply as separate reads.
#[derive(Debug)]
pub struct VirtualModem {
    /// Answer to the serial-number query
    response: ModemResponse,
    /// Whether command lines are echoed back
    echo: bool,
    /// Partial command line being received
    line: Vec<u8>,
    /// Output chunks not yet read
    pending: VecDeque<Vec<u8>>,
    /// Reader waiting for output
    read_waker: Option<Waker>,
    /// Every complete command line received
    commands: Vec<String>,
}

impl VirtualModem {
    /// Create a modem that reports `identifier`
    pub fn new(identifier: impl Into<String>) -> Self {
        Self::with_response(ModemResponse::Identifier(identifier.into()))
    }

    /// Create a modem with a specific serial-number answer
    pub fn with_response(response: ModemResponse) -> Self {
        Self {
            response,
            echo: true,
            line: Vec::new(),
            pending: VecDeque::new(),
            read_waker: None,
            commands: Vec::new(),
        }
    }

    /// Enable or disable command echo (`ATE1`/`ATE0`)
    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    /// Command lines received so far, without terminators
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    fn push_output(&mut self, bytes: Vec<u8>) {
        self.pending.push_back(bytes);
        if let Some(waker) = self.read_waker.take() {
            waker.wake();
        }
    }

    fn handle_line(&mut self, line: String) {
        trace!("Virtual modem received {:?}", line);

        if self.echo {
            self.push_output(format!("{}\r\n", line).into_bytes());
        }

        if line.eq_ignore_ascii_case(AtCommand::ReadSerialNumber.as_str()) {
            match self.response.clone() {
                ModemResponse::Identifier(id) => self.push_output(ModemResponse::frame(&id)),
                ModemResponse::Raw(bytes) => self.push_output(bytes),
                ModemResponse::Silent => {}
            }
        } else if line.eq_ignore_ascii_case("AT") {
            self.push_output(b"\r\nOK\r\n".to_vec());
        } else {
            self.push_output(b"\r\nERROR\r\n".to_vec());
        }

        self.commands.push(line);
    }
}

impl AsyncRead for VirtualModem {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.pending.pop_front() {
            Some(mut chunk) => {
                let n = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.pending.push_front(chunk.split_off(n));
                }
                Poll::Ready(Ok(()))
            }
            None => {
                self.read_waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl AsyncWrite for VirtualModem {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        for &byte in data {
            match byte {
                b'\r' => {
                    let line = String::from_utf8_lossy(&self.line).into_owned();
                    self.line.clear();
                    self.handle_line(line);
                }
                b'\n' => {}
                _ => self.line.push(byte),
            }
        }
        Poll::Ready(Ok(data.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use modem_at::{query_identifier, AtError, REPLY_MIN_LEN};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const TIMEOUT: Duration = Duration::from_millis(10);

    #[test]
    fn test_frame_is_full_width() {
        assert_eq!(ModemResponse::frame("123456789012345").len(), REPLY_MIN_LEN);
    }

    #[tokio::test]
    async fn test_echo_then_reply() {
        let mut modem = VirtualModem::new("356938035643809");
        modem.write_all(b"AT+CGSN\r\n").await.unwrap();

        let mut buf = [0u8; 64];
        let n = modem.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"AT+CGSN\r\n");

        let n = modem.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"\r\n356938035643809\r\n\r\nOK\r\n");
        assert_eq!(modem.commands(), ["AT+CGSN"]);
    }

    #[tokio::test]
    async fn test_unknown_command_errors() {
        let mut modem = VirtualModem::new("356938035643809");
        modem.set_echo(false);
        modem.write_all(b"AT+CSQ\r\n").await.unwrap();

        let mut buf = [0u8; 64];
        let n = modem.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"\r\nERROR\r\n");
    }

    #[tokio::test]
    async fn test_query_against_virtual_modem() {
        let mut modem = VirtualModem::new("356938035643809");

        let id = query_identifier(&mut modem, "/dev/ttyUSB2", TIMEOUT)
            .await
            .unwrap();

        assert_eq!(id, "356938035643809");
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_against_silent_modem() {
        let mut modem = VirtualModem::with_response(ModemResponse::Silent);

        let err = query_identifier(&mut modem, "/dev/ttyUSB2", TIMEOUT)
            .await
            .unwrap_err();

        assert!(matches!(err, AtError::Read { .. }));
    }
}
