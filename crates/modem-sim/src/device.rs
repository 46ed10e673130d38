//! Simulated USB modem topology
//!
//! Builds the hot-plug events a real composite USB modem produces: several
//! serial interfaces (only one with three endpoints accepts AT commands),
//! one network interface, and the whole-device removal.

use modem_hotplug::{subsystem, Action, DeviceEvent, UsbDevice, MODEM_COMMAND_ENDPOINTS};

/// One simulated physical modem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedUsbModem {
    /// The whole USB device
    pub usb: UsbDevice,
    /// Kernel name of the AT command TTY
    pub command_port: String,
    /// Kernel name of the network interface
    pub interface_name: String,
}

impl SimulatedUsbModem {
    /// Create a modem at USB device path `path` with the given IDs
    pub fn new(
        path: impl Into<String>,
        vendor_id: impl Into<String>,
        product_id: impl Into<String>,
    ) -> Self {
        Self {
            usb: UsbDevice {
                path: path.into(),
                vendor_id: vendor_id.into(),
                product_id: product_id.into(),
            },
            command_port: "ttyUSB2".to_string(),
            interface_name: "wwan0".to_string(),
        }
    }

    /// Use a different kernel name for the command TTY
    pub fn with_command_port(mut self, sysname: impl Into<String>) -> Self {
        self.command_port = sysname.into();
        self
    }

    /// Use a different network interface name
    pub fn with_interface_name(mut self, name: impl Into<String>) -> Self {
        self.interface_name = name.into();
        self
    }

    /// Device-node path of the command TTY
    pub fn command_port_path(&self) -> String {
        format!("/dev/{}", self.command_port)
    }

    /// Event for any serial interface of this modem
    pub fn tty(&self, action: Action, sysname: &str, endpoints: &str) -> DeviceEvent {
        DeviceEvent {
            action,
            devnode: format!("/dev/{}", sysname),
            subsystem: subsystem::TTY.to_string(),
            sysname: sysname.to_string(),
            usb_device: Some(self.usb.clone()),
            interface_endpoints: Some(endpoints.to_string()),
        }
    }

    /// Event for the AT command TTY
    pub fn command_tty(&self, action: Action) -> DeviceEvent {
        self.tty(action, &self.command_port, MODEM_COMMAND_ENDPOINTS)
    }

    /// Event for a diagnostics TTY that does not accept AT commands
    pub fn diag_tty(&self, action: Action) -> DeviceEvent {
        self.tty(action, "ttyUSB0", "02")
    }

    /// Event for the network interface
    pub fn net(&self, action: Action) -> DeviceEvent {
        DeviceEvent {
            action,
            devnode: format!("/sys/class/net/{}", self.interface_name),
            subsystem: subsystem::NET.to_string(),
            sysname: self.interface_name.clone(),
            usb_device: Some(self.usb.clone()),
            interface_endpoints: None,
        }
    }

    /// Removal of the whole USB device
    pub fn unplug(&self) -> DeviceEvent {
        DeviceEvent {
            action: Action::Remove,
            devnode: self.usb.path.clone(),
            subsystem: subsystem::USB.to_string(),
            sysname: "1-1".to_string(),
            usb_device: None,
            interface_endpoints: None,
        }
    }
}

/// Event for a TTY with no USB ancestry (e.g., a built-in UART)
pub fn platform_tty(action: Action, sysname: &str) -> DeviceEvent {
    DeviceEvent {
        action,
        devnode: format!("/dev/{}", sysname),
        subsystem: subsystem::TTY.to_string(),
        sysname: sysname.to_string(),
        usb_device: None,
        interface_endpoints: None,
    }
}
