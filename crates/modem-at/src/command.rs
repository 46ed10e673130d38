//! AT command framing
//!
//! Only the serial-number query is implemented. Its reply has a known fixed
//! width: the identifier line followed by the final result code. No general
//! AT response grammar is parsed.

use crate::error::AtError;

/// Line terminator appended to every command
pub const LINE_END: &[u8] = b"\r\n";

/// Minimum length of a complete serial-number reply
pub const REPLY_MIN_LEN: usize = 25;

/// Number of leading reply bytes that carry the identifier
pub const IDENTIFIER_FIELD_LEN: usize = 17;

/// AT commands sent to a modem's command interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtCommand {
    /// Request product serial number identification (IMEI)
    ReadSerialNumber,
}

impl AtCommand {
    /// Command text without the line terminator
    pub fn as_str(&self) -> &'static str {
        match self {
            AtCommand::ReadSerialNumber => "AT+CGSN",
        }
    }

    /// Encode the command as it goes on the wire
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = self.as_str().as_bytes().to_vec();
        bytes.extend_from_slice(LINE_END);
        bytes
    }
}

/// Extract the hardware identifier from a serial-number reply
///
/// The reply must be at least [`REPLY_MIN_LEN`] bytes. The identifier is the
/// first [`IDENTIFIER_FIELD_LEN`] bytes with surrounding CR, LF and spaces
/// removed.
pub fn parse_identifier_reply(data: &[u8]) -> Result<String, AtError> {
    if data.len() < REPLY_MIN_LEN {
        return Err(AtError::InvalidIdentifier { len: data.len() });
    }

    let field = String::from_utf8_lossy(&data[..IDENTIFIER_FIELD_LEN]);
    let id = field.trim_matches(|c| matches!(c, '\r' | '\n' | ' '));
    if id.is_empty() {
        return Err(AtError::InvalidIdentifier { len: data.len() });
    }

    Ok(id.to_string())
}
