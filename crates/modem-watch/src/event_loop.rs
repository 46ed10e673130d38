//! Monitor event loop
//!
//! Runs on the manager's worker thread. After a one-time enumeration of the
//! devices already present it polls the hot-plug source, sleeping between
//! empty polls. Cancellation is checked once per iteration; an in-flight
//! identification or settle delay always runs to completion.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use modem_hotplug::{Action, DeviceEvent, HotplugSource};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::correlator::{Correlator, Outcome};
use crate::events::ModemEvent;
use crate::filter::FilterSet;
use crate::handlers::Handlers;
use crate::registry::Registry;

/// State shared between the manager and its worker
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) filters: FilterSet,
    pub(crate) registry: Registry,
    pub(crate) handlers: RwLock<Handlers>,
    pub(crate) events: broadcast::Sender<ModemEvent>,
}

impl Shared {
    pub(crate) fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            filters: FilterSet::new(),
            registry: Registry::new(),
            handlers: RwLock::new(Handlers::default()),
            events,
        }
    }

    /// Deliver a notification to the handler and to stream subscribers
    pub(crate) fn notify(&self, event: ModemEvent) {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        handlers.dispatch(&event);

        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// The worker's main loop
pub(crate) struct EventLoop<S> {
    source: S,
    correlator: Correlator,
    shared: Arc<Shared>,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl<S: HotplugSource> EventLoop<S> {
    pub(crate) fn new(
        source: S,
        correlator: Correlator,
        shared: Arc<Shared>,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            correlator,
            shared,
            poll_interval,
            cancel,
        }
    }

    /// Run until cancelled, then clear the registry
    pub(crate) async fn run(mut self) {
        info!("Modem monitor running");

        match self.source.enumerate() {
            Ok(devices) => {
                debug!("Processing {} present device(s)", devices.len());
                for mut device in devices {
                    if self.cancel.is_cancelled() {
                        break;
                    }
                    device.action = Action::Add;
                    self.dispatch(device).await;
                }
            }
            Err(e) => warn!("Failed to enumerate present devices: {}", e),
        }

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            match self.source.try_next() {
                Ok(Some(event)) => self.dispatch(event).await,
                Ok(None) => tokio::time::sleep(self.poll_interval).await,
                Err(e) => {
                    warn!("Hot-plug source error: {}", e);
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        // Records are dropped silently; remove handlers are not fired on stop
        let cleared = self.shared.registry.clear();
        info!("Modem monitor stopped, forgot {} device(s)", cleared);
    }

    async fn dispatch(&self, event: DeviceEvent) {
        debug!(
            "{} {} [{}] {}",
            event.action, event.subsystem, event.sysname, event.devnode
        );

        let outcome = self
            .correlator
            .handle(&event, &self.shared.filters, &self.shared.registry)
            .await;

        let Outcome {
            mutation,
            mut notification,
        } = outcome;

        // Remove handlers still see the departing record in the registry
        if notification.as_ref().is_some_and(ModemEvent::is_removal) {
            if let Some(removed) = notification.take() {
                self.shared.notify(removed);
            }
        }
        if let Some(mutation) = mutation {
            self.shared.registry.apply(mutation);
        }
        if let Some(notification) = notification {
            self.shared.notify(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use modem_hotplug::HotplugError;
    use modem_sim::{ModemResponse, ScriptedHotplug, SimulatedRetriever, SimulatedUsbModem};

    use crate::filter::UsbFilter;
    use crate::handlers::handler;

    const USB_PATH: &str = "/dev/bus/usb/001/004";
    const POLL: Duration = Duration::from_secs(1);
    const SETTLE: Duration = Duration::from_secs(5);

    fn modem() -> SimulatedUsbModem {
        SimulatedUsbModem::new(USB_PATH, "12d1", "1506")
    }

    fn shared_with_log() -> (Arc<Shared>, Arc<Mutex<Vec<String>>>) {
        let shared = Arc::new(Shared::new(16));
        shared.filters.add(UsbFilter::new("12d1", "1506"));

        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, u, r) = (log.clone(), log.clone(), log.clone());
        shared.handlers.write().unwrap().register(
            Some(handler(move |_| a.lock().unwrap().push("added".to_string()))),
            Some(handler(move |_| u.lock().unwrap().push("updated".to_string()))),
            Some(handler(move |_| r.lock().unwrap().push("removed".to_string()))),
        );
        (shared, log)
    }

    fn event_loop<S: HotplugSource>(
        source: S,
        shared: Arc<Shared>,
        cancel: CancellationToken,
    ) -> EventLoop<S> {
        let retriever = SimulatedRetriever::new().with_modem(
            modem().command_port_path(),
            ModemResponse::Identifier("123456789012345".to_string()),
        );
        let correlator = Correlator::new(Arc::new(retriever), SETTLE);
        EventLoop::new(source, correlator, shared, POLL, cancel)
    }

    #[tokio::test(start_paused = true)]
    async fn test_enumeration_is_treated_as_add() {
        let (shared, log) = shared_with_log();
        let mut present = modem().command_tty(Action::Change);
        present.action = Action::Other(String::new());
        let (source, _injector) = ScriptedHotplug::new(vec![present]);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(event_loop(source, shared.clone(), cancel.clone()).run());

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(log.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(*log.lock().unwrap(), ["added"]);
        assert_eq!(shared.registry.ready().len(), 1);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_events_in_order() {
        let (shared, log) = shared_with_log();
        let (source, injector) = ScriptedHotplug::new(Vec::new());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(event_loop(source, shared.clone(), cancel.clone()).run());

        injector.inject(modem().net(Action::Add));
        injector.inject(modem().command_tty(Action::Change));
        injector.inject(modem().unplug());
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(*log.lock().unwrap(), ["updated", "removed"]);
        assert!(shared.registry.is_empty());

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_handler_sees_departing_record() {
        let (shared, _log) = shared_with_log();
        let seen = Arc::new(Mutex::new(None));
        let (weak, recorder) = (Arc::downgrade(&shared), seen.clone());
        shared.handlers.write().unwrap().register(
            None,
            None,
            Some(handler(move |_| {
                if let Some(shared) = weak.upgrade() {
                    *recorder.lock().unwrap() = shared.registry.get(USB_PATH);
                }
            })),
        );
        let (source, injector) = ScriptedHotplug::new(Vec::new());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(event_loop(source, shared.clone(), cancel.clone()).run());

        injector.inject(modem().command_tty(Action::Change));
        injector.inject(modem().unplug());
        tokio::time::sleep(Duration::from_secs(2)).await;

        let record = seen.lock().unwrap().clone().unwrap();
        assert_eq!(record.hardware_id.as_deref(), Some("123456789012345"));
        assert!(shared.registry.is_empty());

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_poll_waits_interval() {
        let (shared, log) = shared_with_log();
        let (source, injector) = ScriptedHotplug::new(Vec::new());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(event_loop(source, shared.clone(), cancel.clone()).run());

        // The loop is asleep after its first empty poll
        tokio::time::sleep(Duration::from_millis(100)).await;
        injector.inject(modem().command_tty(Action::Change));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(log.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(*log.lock().unwrap(), ["updated"]);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_clears_registry_without_remove_handler() {
        let (shared, log) = shared_with_log();
        let (source, _injector) = ScriptedHotplug::new(vec![
            modem().net(Action::Add),
            modem().command_tty(Action::Add),
        ]);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(event_loop(source, shared.clone(), cancel.clone()).run());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(shared.registry.len(), 1);

        cancel.cancel();
        task.await.unwrap();

        assert!(shared.registry.is_empty());
        assert_eq!(*log.lock().unwrap(), ["added"]);
    }

    struct FlakySource {
        failures: usize,
        inner: ScriptedHotplug,
    }

    impl HotplugSource for FlakySource {
        fn enumerate(&mut self) -> Result<Vec<DeviceEvent>, HotplugError> {
            Err(HotplugError::Unavailable("enumeration".to_string()))
        }

        fn try_next(&mut self) -> Result<Option<DeviceEvent>, HotplugError> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(HotplugError::Unavailable("socket".to_string()));
            }
            self.inner.try_next()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_errors_are_not_fatal() {
        let (shared, log) = shared_with_log();
        let (inner, injector) = ScriptedHotplug::new(Vec::new());
        let source = FlakySource { failures: 2, inner };
        let cancel = CancellationToken::new();
        let task = tokio::spawn(event_loop(source, shared.clone(), cancel.clone()).run());

        injector.inject(modem().command_tty(Action::Change));
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(*log.lock().unwrap(), ["updated"]);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_notifications() {
        let (shared, _log) = shared_with_log();
        let mut events = shared.events.subscribe();
        let (source, injector) = ScriptedHotplug::new(Vec::new());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(event_loop(source, shared.clone(), cancel.clone()).run());

        injector.inject(modem().command_tty(Action::Change));
        let event = events.recv().await.unwrap();

        assert_eq!(event.kind(), "updated");
        assert_eq!(event.path(), USB_PATH);

        cancel.cancel();
        task.await.unwrap();
    }
}
