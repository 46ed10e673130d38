//! Modem manager
//!
//! The public facade. A [`Manager`] owns the filters, the registry and the
//! handlers, and runs the event loop on a dedicated `modem-monitor` thread
//! with its own current-thread tokio runtime. Every method takes `&self`
//! and may be called while the worker runs.

use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use modem_at::{IdentifierRetriever, SerialIdentifierRetriever};
use modem_hotplug::{HotplugError, HotplugSource};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::MonitorConfig;
use crate::correlator::Correlator;
use crate::error::ManagerError;
use crate::event_loop::{EventLoop, Shared};
use crate::events::ModemEvent;
use crate::filter::UsbFilter;
use crate::handlers::ModemHandler;
use crate::modem::Modem;

/// Capacity of the lifecycle event stream
const EVENT_CAPACITY: usize = 64;

/// Name of the worker thread
const WORKER_NAME: &str = "modem-monitor";

/// Builds the hot-plug source on the worker thread
///
/// Called once per [`Manager::monitor`], so a source never outlives the run
/// it was opened for.
pub type SourceFactory =
    Arc<dyn Fn() -> Result<Box<dyn HotplugSource>, HotplugError> + Send + Sync>;

struct Worker {
    cancel: CancellationToken,
    thread: JoinHandle<()>,
}

#[derive(Default)]
struct MonitorState {
    /// The running worker, if monitoring
    worker: Option<Worker>,
    /// A cancelled worker that may still be finishing its last event
    stopping: Option<JoinHandle<()>>,
}

/// Tracks USB modems matching the registered filters
pub struct Manager {
    shared: Arc<Shared>,
    config: MonitorConfig,
    source_factory: SourceFactory,
    retriever: Arc<dyn IdentifierRetriever>,
    state: Mutex<MonitorState>,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    /// Create a manager backed by udev and real serial ports
    pub fn new() -> Self {
        Self::with_config(MonitorConfig::default())
    }

    /// Create a udev and serial backed manager with custom timing
    pub fn with_config(config: MonitorConfig) -> Self {
        let retriever = Arc::new(SerialIdentifierRetriever::with_config(
            config.retriever.clone(),
        ));
        Self::with_backend(config, platform_source, retriever)
    }

    /// Create a manager with injected collaborators
    pub fn with_backend<F>(
        config: MonitorConfig,
        source_factory: F,
        retriever: Arc<dyn IdentifierRetriever>,
    ) -> Self
    where
        F: Fn() -> Result<Box<dyn HotplugSource>, HotplugError> + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared::new(EVENT_CAPACITY)),
            config,
            source_factory: Arc::new(source_factory),
            retriever,
            state: Mutex::new(MonitorState::default()),
        }
    }

    /// The timing and serial settings in use
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Track USB devices with this vendor and product ID
    ///
    /// Takes effect for the next event the worker handles.
    pub fn add_filter(&self, vendor_id: impl Into<String>, product_id: impl Into<String>) {
        self.shared
            .filters
            .add(UsbFilter::new(vendor_id, product_id));
    }

    /// Registered filters, in insertion order
    pub fn filters(&self) -> Vec<UsbFilter> {
        self.shared.filters.to_vec()
    }

    /// Replace the lifecycle handlers; `None` keeps the current one
    pub fn register_handlers(
        &self,
        added: Option<ModemHandler>,
        updated: Option<ModemHandler>,
        removed: Option<ModemHandler>,
    ) {
        self.shared
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(added, updated, removed);
    }

    /// Subscribe to every lifecycle notification
    pub fn subscribe(&self) -> broadcast::Receiver<ModemEvent> {
        self.shared.events.subscribe()
    }

    /// Start the worker
    ///
    /// Returns once the hot-plug source is open. A worker left over from a
    /// previous [`stop_monitor`](Self::stop_monitor) is joined first.
    pub fn monitor(&self) -> Result<(), ManagerError> {
        let mut state = self.lock_state();
        while state.worker.is_none() {
            let Some(previous) = state.stopping.take() else {
                break;
            };
            drop(state);
            debug!("Waiting for previous monitor worker to exit");
            join_worker(previous);
            state = self.lock_state();
        }
        if state.worker.is_some() {
            return Err(ManagerError::AlreadyMonitoring);
        }

        let cancel = CancellationToken::new();
        let (ready_tx, ready_rx) = mpsc::channel();

        let factory = self.source_factory.clone();
        let correlator = Correlator::new(self.retriever.clone(), self.config.settle_delay);
        let shared = self.shared.clone();
        let poll_interval = self.config.poll_interval;
        let worker_cancel = cancel.clone();

        let thread = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(ManagerError::Spawn(e)));
                        return;
                    }
                };

                let source = match factory() {
                    Ok(source) => source,
                    Err(e) => {
                        let _ = ready_tx.send(Err(ManagerError::Source(e)));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                let event_loop =
                    EventLoop::new(source, correlator, shared, poll_interval, worker_cancel);
                runtime.block_on(event_loop.run());
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                state.worker = Some(Worker { cancel, thread });
                info!("Monitoring started");
                Ok(())
            }
            Ok(Err(e)) => {
                join_worker(thread);
                error!("Failed to start monitoring: {}", e);
                Err(e)
            }
            Err(_) => {
                join_worker(thread);
                Err(ManagerError::WorkerExited)
            }
        }
    }

    /// Ask the worker to stop
    ///
    /// Does not wait: the worker finishes the event it is handling, clears
    /// the registry and exits. Use [`wait_stopped`](Self::wait_stopped) to
    /// block until it has.
    pub fn stop_monitor(&self) -> Result<(), ManagerError> {
        let mut state = self.lock_state();
        let Some(worker) = state.worker.take() else {
            return Err(ManagerError::NotMonitoring);
        };

        worker.cancel.cancel();
        state.stopping = Some(worker.thread);
        info!("Monitoring stopped");
        Ok(())
    }

    /// Block until a stopped worker has exited
    ///
    /// Returns immediately if no worker is stopping.
    pub fn wait_stopped(&self) {
        let stopping = self.lock_state().stopping.take();
        if let Some(thread) = stopping {
            join_worker(thread);
        }
    }

    /// Check if the worker is running
    pub fn is_monitoring(&self) -> bool {
        self.lock_state().worker.is_some()
    }

    /// Copy of every ready modem, keyed by USB device path
    pub fn list(&self) -> HashMap<String, Modem> {
        self.shared.registry.ready()
    }

    /// Copy of every tracked modem, ready or not
    pub fn list_all(&self) -> HashMap<String, Modem> {
        self.shared.registry.snapshot()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(worker) = state.worker.take() {
            worker.cancel.cancel();
        }
    }
}

fn join_worker(thread: JoinHandle<()>) {
    if thread.join().is_err() {
        error!("Monitor worker panicked");
    }
}

#[cfg(target_os = "linux")]
fn platform_source() -> Result<Box<dyn HotplugSource>, HotplugError> {
    Ok(Box::new(modem_hotplug::UdevSource::open()?))
}

#[cfg(not(target_os = "linux"))]
fn platform_source() -> Result<Box<dyn HotplugSource>, HotplugError> {
    Err(HotplugError::Unavailable(
        "udev hot-plug monitoring requires Linux".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use modem_hotplug::Action;
    use modem_sim::{
        HotplugInjector, ModemResponse, ScriptedHotplug, SimulatedRetriever, SimulatedUsbModem,
    };

    use crate::handlers::handler;

    const IMEI: &str = "123456789012345";

    fn fast_config() -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_millis(5),
            settle_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    fn modem() -> SimulatedUsbModem {
        SimulatedUsbModem::new("/dev/bus/usb/001/004", "12d1", "1506")
    }

    fn scripted_manager(present: Vec<modem_hotplug::DeviceEvent>) -> (Manager, HotplugInjector) {
        let (source, injector) = ScriptedHotplug::new(present);
        let retriever = SimulatedRetriever::new().with_modem(
            modem().command_port_path(),
            ModemResponse::Identifier(IMEI.to_string()),
        );
        let manager = Manager::with_backend(
            fast_config(),
            move || Ok(Box::new(source.clone()) as Box<dyn HotplugSource>),
            Arc::new(retriever),
        );
        manager.add_filter("12d1", "1506");
        (manager, injector)
    }

    fn wait_for(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_manager_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Manager>();
    }

    #[test]
    fn test_double_start_rejected() {
        let (manager, _injector) = scripted_manager(Vec::new());

        manager.monitor().unwrap();
        assert!(matches!(
            manager.monitor(),
            Err(ManagerError::AlreadyMonitoring)
        ));
        assert!(manager.is_monitoring());

        manager.stop_monitor().unwrap();
        manager.wait_stopped();
    }

    #[test]
    fn test_stop_when_idle_rejected() {
        let (manager, _injector) = scripted_manager(Vec::new());
        assert!(matches!(
            manager.stop_monitor(),
            Err(ManagerError::NotMonitoring)
        ));

        manager.monitor().unwrap();
        manager.stop_monitor().unwrap();
        assert!(!manager.is_monitoring());
        assert!(matches!(
            manager.stop_monitor(),
            Err(ManagerError::NotMonitoring)
        ));
        manager.wait_stopped();
    }

    #[test]
    fn test_source_failure_leaves_manager_idle() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let (source, _injector) = ScriptedHotplug::new(Vec::new());
        let manager = Manager::with_backend(
            fast_config(),
            move || {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(HotplugError::Unavailable("netlink".to_string()))
                } else {
                    Ok(Box::new(source.clone()) as Box<dyn HotplugSource>)
                }
            },
            Arc::new(SimulatedRetriever::new()),
        );

        assert!(matches!(manager.monitor(), Err(ManagerError::Source(_))));
        assert!(!manager.is_monitoring());

        manager.monitor().unwrap();
        assert!(manager.is_monitoring());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);

        manager.stop_monitor().unwrap();
        manager.wait_stopped();
    }

    #[test]
    fn test_stop_clears_registry_and_restart_reenumerates() {
        let adds = Arc::new(AtomicUsize::new(0));
        let removes = Arc::new(AtomicUsize::new(0));
        let (on_add, on_remove) = (adds.clone(), removes.clone());

        let (manager, _injector) = scripted_manager(vec![
            modem().net(Action::Add),
            modem().command_tty(Action::Add),
        ]);
        manager.register_handlers(
            Some(handler(move |_| {
                on_add.fetch_add(1, Ordering::SeqCst);
            })),
            None,
            Some(handler(move |_| {
                on_remove.fetch_add(1, Ordering::SeqCst);
            })),
        );

        manager.monitor().unwrap();
        assert!(wait_for(|| manager.list().len() == 1));

        manager.stop_monitor().unwrap();
        manager.wait_stopped();
        assert!(manager.list_all().is_empty());
        assert_eq!(removes.load(Ordering::SeqCst), 0);

        manager.monitor().unwrap();
        assert!(wait_for(|| manager.list().len() == 1));
        assert_eq!(adds.load(Ordering::SeqCst), 2);

        manager.stop_monitor().unwrap();
        manager.wait_stopped();
    }

    #[test]
    fn test_restart_without_waiting() {
        let (manager, _injector) = scripted_manager(vec![modem().command_tty(Action::Add)]);

        manager.monitor().unwrap();
        assert!(wait_for(|| manager.list().len() == 1));
        manager.stop_monitor().unwrap();

        // monitor() joins the stopping worker before starting a new one
        manager.monitor().unwrap();
        assert!(wait_for(|| manager.list().len() == 1));

        manager.stop_monitor().unwrap();
        manager.wait_stopped();
    }

    #[test]
    fn test_state_queries_not_blocked_by_restart() {
        let (source, _injector) = ScriptedHotplug::new(vec![modem().command_tty(Action::Add)]);
        let manager = Manager::with_backend(
            MonitorConfig {
                settle_delay: Duration::from_millis(400),
                ..fast_config()
            },
            move || Ok(Box::new(source.clone()) as Box<dyn HotplugSource>),
            Arc::new(SimulatedRetriever::new()),
        );
        manager.add_filter("12d1", "1506");

        manager.monitor().unwrap();
        // Let the worker enter the settle delay
        thread::sleep(Duration::from_millis(50));
        manager.stop_monitor().unwrap();

        thread::scope(|scope| {
            let restart = scope.spawn(|| manager.monitor());
            thread::sleep(Duration::from_millis(50));

            let started = Instant::now();
            assert!(!manager.is_monitoring());
            assert!(started.elapsed() < Duration::from_millis(200));

            restart.join().unwrap().unwrap();
        });

        assert!(manager.is_monitoring());
        manager.stop_monitor().unwrap();
        manager.wait_stopped();
    }

    #[test]
    fn test_list_hides_unidentified_modems() {
        let (manager, injector) = scripted_manager(Vec::new());
        let other = SimulatedUsbModem::new("/dev/bus/usb/001/005", "12d1", "1506")
            .with_command_port("ttyUSB5");

        manager.monitor().unwrap();
        injector.inject(modem().command_tty(Action::Change));
        injector.inject(other.command_tty(Action::Change));

        assert!(wait_for(|| manager.list_all().len() == 2));
        let ready = manager.list();
        assert_eq!(ready.len(), 1);
        assert_eq!(
            ready["/dev/bus/usb/001/004"].hardware_id.as_deref(),
            Some(IMEI)
        );

        manager.stop_monitor().unwrap();
        manager.wait_stopped();
    }

    #[test]
    fn test_handlers_replaced_while_running() {
        let (manager, injector) = scripted_manager(Vec::new());
        let updates = Arc::new(AtomicUsize::new(0));
        let counter = updates.clone();

        manager.monitor().unwrap();
        manager.register_handlers(
            None,
            Some(handler(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
            None,
        );
        injector.inject(modem().command_tty(Action::Change));

        assert!(wait_for(|| updates.load(Ordering::SeqCst) == 1));

        manager.stop_monitor().unwrap();
        manager.wait_stopped();
    }

    #[test]
    fn test_filters_accumulate() {
        let (manager, _injector) = scripted_manager(Vec::new());
        manager.add_filter("1bc7", "1201");
        manager.add_filter("12d1", "1506");

        assert_eq!(
            manager.filters(),
            vec![
                UsbFilter::new("12d1", "1506"),
                UsbFilter::new("1bc7", "1201"),
                UsbFilter::new("12d1", "1506"),
            ]
        );
    }
}
