//! USB Modem Simulation Library
//!
//! This crate provides a simulation layer for testing modem tracking
//! without physical hardware. It includes:
//!
//! - **VirtualModem**: an in-memory serial port that answers AT commands
//! - **SimulatedRetriever**: an identifier retriever backed by virtual modems
//! - **ScriptedHotplug**: a hot-plug source fed from a script and a channel
//! - **SimulatedUsbModem**: builds realistic tty/net/remove events for one device
//!
//! # Example
//!
//! ```rust
//! use modem_sim::{ScriptedHotplug, SimulatedUsbModem};
//! use modem_hotplug::{Action, HotplugSource};
//!
//! let modem = SimulatedUsbModem::new("/dev/bus/usb/001/004", "12d1", "1506");
//! let (mut source, injector) = ScriptedHotplug::new(vec![modem.command_tty(Action::Add)]);
//!
//! injector.inject(modem.unplug());
//! assert_eq!(source.enumerate().unwrap().len(), 1);
//! assert!(source.try_next().unwrap().unwrap().is_remove());
//! ```

pub mod device;
pub mod hotplug;
pub mod modem;
pub mod retriever;

pub use device::{platform_tty, SimulatedUsbModem};
pub use hotplug::{HotplugInjector, ScriptedHotplug};
pub use modem::{ModemResponse, VirtualModem};
pub use retriever::SimulatedRetriever;
