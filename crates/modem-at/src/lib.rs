//! AT Command Library for USB Modems
//!
//! This crate provides the small slice of the AT command set needed to
//! identify a modem: framing of the serial-number query and retrieval of
//! the hardware identifier (IMEI) over a serial port.
//!
//! # Example
//!
//! ```rust,no_run
//! use modem_at::{IdentifierRetriever, SerialIdentifierRetriever};
//!
//! # async fn run() -> Result<(), modem_at::AtError> {
//! let retriever = SerialIdentifierRetriever::new();
//! let imei = retriever.retrieve_id("/dev/ttyUSB2").await?;
//! println!("IMEI: {}", imei);
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod error;
pub mod retriever;

pub use command::{parse_identifier_reply, AtCommand, IDENTIFIER_FIELD_LEN, REPLY_MIN_LEN};
pub use error::AtError;
pub use retriever::{
    query_identifier, IdentifierRetriever, RetrieverConfig, SerialIdentifierRetriever,
};
