//! Modem records

use serde::Serialize;

/// A logical modem assembled from its tty and net devices
///
/// Fields fill in as the corresponding kernel events are seen. A record
/// may sit in the registry half-populated for a while.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Modem {
    /// Network interface name (e.g., wwan0)
    pub network_interface: Option<String>,
    /// Device-node path of the AT command port
    pub serial_port: Option<String>,
    /// Hardware identifier (IMEI)
    pub hardware_id: Option<String>,
}

impl Modem {
    /// Check if both the command port and the identifier are known
    pub fn is_ready(&self) -> bool {
        self.serial_port.is_some() && self.hardware_id.is_some()
    }
}
