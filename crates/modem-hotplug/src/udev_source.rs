//! udev-backed hot-plug source
//!
//! Listens on the netlink `udev` group for tty, net and whole-USB-device
//! events, and enumerates existing tty and net devices on request.

use tracing::{debug, info, trace};
use udev::{Device, Enumerator, EventType, MonitorBuilder, MonitorSocket};

use crate::error::HotplugError;
use crate::event::{subsystem, Action, DeviceEvent, UsbDevice};
use crate::source::HotplugSource;

/// Hot-plug source reading from udev
pub struct UdevSource {
    socket: MonitorSocket,
}

impl UdevSource {
    /// Open a udev monitor socket
    pub fn open() -> Result<Self, HotplugError> {
        let socket = MonitorBuilder::new()?
            .match_subsystem(subsystem::TTY)?
            .match_subsystem(subsystem::NET)?
            .match_subsystem_devtype(subsystem::USB, subsystem::USB_DEVICE)?
            .listen()?;

        info!("Listening for udev events");
        Ok(Self { socket })
    }
}

impl HotplugSource for UdevSource {
    fn enumerate(&mut self) -> Result<Vec<DeviceEvent>, HotplugError> {
        let mut enumerator = Enumerator::new()?;
        enumerator.match_subsystem(subsystem::TTY)?;
        enumerator.match_subsystem(subsystem::NET)?;

        let devices: Vec<_> = enumerator
            .scan_devices()?
            .map(|device| snapshot(&device, Action::Add))
            .collect();

        debug!("Enumerated {} tty/net device(s)", devices.len());
        Ok(devices)
    }

    fn try_next(&mut self) -> Result<Option<DeviceEvent>, HotplugError> {
        let Some(event) = self.socket.iter().next() else {
            return Ok(None);
        };

        let action = match event.event_type() {
            EventType::Add => Action::Add,
            EventType::Remove => Action::Remove,
            EventType::Change => Action::Change,
            other => Action::Other(format!("{:?}", other).to_lowercase()),
        };

        let snapshot = snapshot(&event.device(), action);
        trace!("udev event: {:?}", snapshot);
        Ok(Some(snapshot))
    }
}

/// Device-node path, falling back to the syspath for node-less devices
fn device_path(device: &Device) -> String {
    device
        .devnode()
        .unwrap_or_else(|| device.syspath())
        .to_string_lossy()
        .into_owned()
}

fn attribute(device: &Device, name: &str) -> Option<String> {
    device
        .attribute_value(name)
        .map(|value| value.to_string_lossy().trim().to_string())
}

/// Read everything the correlator needs while the device still exists
fn snapshot(device: &Device, action: Action) -> DeviceEvent {
    let usb_device = device
        .parent_with_subsystem_devtype(subsystem::USB, subsystem::USB_DEVICE)
        .ok()
        .flatten()
        .map(|parent| UsbDevice {
            path: device_path(&parent),
            vendor_id: attribute(&parent, "idVendor").unwrap_or_default(),
            product_id: attribute(&parent, "idProduct").unwrap_or_default(),
        });

    let interface_endpoints = device
        .parent()
        .and_then(|parent| parent.parent())
        .and_then(|interface| attribute(&interface, "bNumEndpoints"));

    DeviceEvent {
        action,
        devnode: device_path(device),
        subsystem: device
            .subsystem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        sysname: device.sysname().to_string_lossy().into_owned(),
        usb_device,
        interface_endpoints,
    }
}
