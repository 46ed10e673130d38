//! Hot-plug Notification Library
//!
//! This crate describes kernel hot-plug events for the device classes a USB
//! modem exposes (serial TTYs and network interfaces) and provides a source
//! of such events backed by udev on Linux.
//!
//! Events are captured as plain [`DeviceEvent`] snapshots: the attributes a
//! consumer needs (parent USB IDs, interface endpoint count) are read when
//! the event is received, so events can be moved across threads and built
//! by hand in tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use modem_hotplug::{HotplugSource, UdevSource};
//!
//! let mut source = UdevSource::open().unwrap();
//! for device in source.enumerate().unwrap() {
//!     println!("{} ({})", device.devnode, device.subsystem);
//! }
//! ```

pub mod error;
pub mod event;
pub mod source;
#[cfg(target_os = "linux")]
pub mod udev_source;

pub use error::HotplugError;
pub use event::{subsystem, Action, DeviceEvent, UsbDevice, MODEM_COMMAND_ENDPOINTS};
pub use source::HotplugSource;
#[cfg(target_os = "linux")]
pub use udev_source::UdevSource;
