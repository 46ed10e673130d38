//! Hot-plug source abstraction

use crate::error::HotplugError;
use crate::event::DeviceEvent;

/// A source of hot-plug notifications
///
/// Sources are polled: [`try_next`](HotplugSource::try_next) never blocks
/// and returns `Ok(None)` when no event is pending. Pacing the poll is the
/// caller's job.
pub trait HotplugSource {
    /// Snapshot every currently present tty and net device
    fn enumerate(&mut self) -> Result<Vec<DeviceEvent>, HotplugError>;

    /// Take the next pending event, if any
    fn try_next(&mut self) -> Result<Option<DeviceEvent>, HotplugError>;
}

impl<S: HotplugSource + ?Sized> HotplugSource for Box<S> {
    fn enumerate(&mut self) -> Result<Vec<DeviceEvent>, HotplugError> {
        (**self).enumerate()
    }

    fn try_next(&mut self) -> Result<Option<DeviceEvent>, HotplugError> {
        (**self).try_next()
    }
}
