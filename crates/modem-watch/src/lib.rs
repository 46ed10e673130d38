//! USB Modem Tracking Engine
//!
//! This crate correlates kernel hot-plug notifications into logical modem
//! records and reports their lifecycle to registered handlers.
//!
//! # Architecture
//!
//! A USB modem shows up as several independent kernel devices: one or more
//! serial TTYs and a network interface. Their events arrive separately and
//! in no fixed order. The engine keys every event by the whole USB device
//! it belongs to, so both halves converge on one [`Modem`] record:
//!
//! - The **network** event fills in the interface name
//! - The **command TTY** event (the interface with three endpoints) triggers
//!   identifier retrieval over AT commands and fires the add/update handler
//! - Removal of the **USB device** drops the record and fires the remove handler
//!
//! A [`Manager`] owns the filters, the registry and the handlers, and runs
//! the event loop on a dedicated worker thread.
//!
//! # Example
//!
//! ```rust,no_run
//! use modem_watch::{handler, Manager};
//!
//! let manager = Manager::new();
//! manager.add_filter("12d1", "1506");
//! manager.register_handlers(
//!     Some(handler(|modem| println!("added {:?}", modem.hardware_id))),
//!     None,
//!     Some(handler(|modem| println!("removed {:?}", modem.network_interface))),
//! );
//!
//! manager.monitor().unwrap();
//! // ...
//! println!("{:?}", manager.list());
//! manager.stop_monitor().unwrap();
//! ```

pub mod config;
pub mod correlator;
pub mod error;
mod event_loop;
pub mod events;
pub mod filter;
pub mod handlers;
pub mod manager;
pub mod modem;
pub mod registry;

pub use config::MonitorConfig;
pub use correlator::{Correlator, Mutation, Outcome};
pub use error::ManagerError;
pub use events::ModemEvent;
pub use filter::{FilterSet, UsbFilter};
pub use handlers::{handler, Handlers, ModemHandler};
pub use manager::{Manager, SourceFactory};
pub use modem::Modem;
pub use registry::Registry;
