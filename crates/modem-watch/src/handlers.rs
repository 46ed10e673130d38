//! Lifecycle handlers

use std::fmt;
use std::sync::Arc;

use crate::events::ModemEvent;
use crate::modem::Modem;

/// Callback invoked with a copy of the affected modem
pub type ModemHandler = Arc<dyn Fn(Modem) + Send + Sync>;

/// Wrap a closure as a [`ModemHandler`]
pub fn handler<F>(f: F) -> ModemHandler
where
    F: Fn(Modem) + Send + Sync + 'static,
{
    Arc::new(f)
}

fn noop() -> ModemHandler {
    handler(|_| {})
}

/// The add, update and remove handlers
///
/// Every slot starts out as a no-op, so dispatch never has to check for a
/// missing handler.
#[derive(Clone)]
pub struct Handlers {
    added: ModemHandler,
    updated: ModemHandler,
    removed: ModemHandler,
}

impl Default for Handlers {
    fn default() -> Self {
        Self {
            added: noop(),
            updated: noop(),
            removed: noop(),
        }
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers").finish_non_exhaustive()
    }
}

impl Handlers {
    /// Replace the handlers given as `Some`; `None` keeps the current one
    pub fn register(
        &mut self,
        added: Option<ModemHandler>,
        updated: Option<ModemHandler>,
        removed: Option<ModemHandler>,
    ) {
        if let Some(h) = added {
            self.added = h;
        }
        if let Some(h) = updated {
            self.updated = h;
        }
        if let Some(h) = removed {
            self.removed = h;
        }
    }

    /// Handler responsible for `event`
    pub fn for_event(&self, event: &ModemEvent) -> ModemHandler {
        match event {
            ModemEvent::Added { .. } => self.added.clone(),
            ModemEvent::Updated { .. } => self.updated.clone(),
            ModemEvent::Removed { .. } => self.removed.clone(),
        }
    }

    /// Invoke the handler responsible for `event`
    pub fn dispatch(&self, event: &ModemEvent) {
        (self.for_event(event))(event.modem().clone());
    }
}
