//! Simulated identifier retrieval
//!
//! Each lookup spins up a fresh [`VirtualModem`] for the requested port and
//! runs the real AT exchange against it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use modem_at::{query_identifier, AtError, IdentifierRetriever, RetrieverConfig};
use tracing::debug;

use crate::modem::{ModemResponse, VirtualModem};

/// Identifier retriever backed by virtual modems keyed by port path
#[derive(Debug)]
pub struct SimulatedRetriever {
    /// Answer per port path; ports without an entry fail to open
    modems: Mutex<HashMap<String, ModemResponse>>,
    /// Read timeout for the exchange
    read_timeout: Duration,
    /// Number of lookups performed
    calls: AtomicUsize,
}

impl Default for SimulatedRetriever {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRetriever {
    /// Create a retriever with no modems attached
    pub fn new() -> Self {
        Self {
            modems: Mutex::new(HashMap::new()),
            read_timeout: RetrieverConfig::default().read_timeout,
            calls: AtomicUsize::new(0),
        }
    }

    /// Attach a modem answering with `response` at `port`
    pub fn with_modem(self, port: impl Into<String>, response: ModemResponse) -> Self {
        self.set_response(port, response);
        self
    }

    /// Change (or attach) the modem at `port`
    pub fn set_response(&self, port: impl Into<String>, response: ModemResponse) {
        self.modems
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(port.into(), response);
    }

    /// Number of lookups performed so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentifierRetriever for SimulatedRetriever {
    async fn retrieve_id(&self, port: &str) -> Result<String, AtError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let response = self
            .modems
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(port)
            .cloned();

        let Some(response) = response else {
            debug!("No simulated modem at {}", port);
            return Err(AtError::Open {
                port: port.to_string(),
                source: serialport::Error::new(
                    serialport::ErrorKind::NoDevice,
                    "no simulated modem attached",
                ),
            });
        };

        let mut modem = VirtualModem::with_response(response);
        query_identifier(&mut modem, port, self.read_timeout).await
    }
}
