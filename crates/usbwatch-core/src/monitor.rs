//! Monitor controller owning the start/stop lifecycle of device
//! monitoring.
//!
//! A [`UsbMonitor`] guarantees at most one active listener, is the single
//! registration point for the change and end callbacks, and owns the
//! process-wide [`MonitorState`] transitions. The last-known snapshot is
//! shared only between the controller and its listener; queries never
//! touch it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::descriptor::Snapshot;
use crate::enumerate::{DeviceEnumerator, SysinfoEnumerator};
use crate::error::{Error, Result};
use crate::events::{ChangeEvent, ChangeHandler, EndEvent, EndHandler};
use crate::listener::{self, DEFAULT_POLL_INTERVAL};

/// Process-wide monitoring lifecycle state.
///
/// `Starting` and `Stopping` are transient sub-states during which
/// concurrent `start`/`stop` calls are rejected rather than queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorState {
    /// No session active.
    Stopped,
    /// A session is being set up (initial snapshot in progress).
    Starting,
    /// The listener is observing device changes.
    Running,
    /// A session is tearing down (listener draining).
    Stopping,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "Stopped"),
            Self::Starting => write!(f, "Starting"),
            Self::Running => write!(f, "Running"),
            Self::Stopping => write!(f, "Stopping"),
        }
    }
}

/// State owned by one `start()`..`stop()` session.
struct Session {
    shutdown_tx: mpsc::Sender<()>,
    join_handle: JoinHandle<()>,
    last_known: Arc<Mutex<Snapshot>>,
    on_end: Option<EndHandler>,
}

struct Inner {
    state: MonitorState,
    session: Option<Session>,
}

/// Controller for USB mass-storage monitoring sessions.
///
/// Construct one instance at process scope and pass it to whatever
/// boundary layer needs it; there is no implicit singleton.
pub struct UsbMonitor<E = SysinfoEnumerator> {
    enumerator: Arc<RwLock<E>>,
    inner: Arc<Mutex<Inner>>,
    poll_interval: Duration,
}

impl UsbMonitor<SysinfoEnumerator> {
    /// Create a monitor over the default OS enumerator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_enumerator(SysinfoEnumerator::new())
    }
}

impl Default for UsbMonitor<SysinfoEnumerator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> UsbMonitor<E>
where
    E: DeviceEnumerator + 'static,
{
    /// Create a monitor over a custom enumerator.
    #[must_use]
    pub fn with_enumerator(enumerator: E) -> Self {
        Self {
            enumerator: Arc::new(RwLock::new(enumerator)),
            inner: Arc::new(Mutex::new(Inner {
                state: MonitorState::Stopped,
                session: None,
            })),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the interval between device-change observations.
    #[must_use]
    pub const fn with_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> MonitorState {
        self.inner.lock().await.state
    }

    /// Start a monitoring session.
    ///
    /// Takes an initial snapshot synchronously before returning, so a
    /// query issued right after `start` sees consistent state. Rejects
    /// with [`Error::AlreadyRunning`] unless the monitor is `Stopped`;
    /// an enumeration failure aborts the start and resets to `Stopped`.
    ///
    /// `on_change` runs on the listener's background context, strictly
    /// ordered and never overlapped. `on_end` fires exactly once, after
    /// the last change callback of the session. A callback that never
    /// returns will stall `stop()`; that is the caller's responsibility.
    pub async fn start<C, F>(&self, on_change: C, on_end: F) -> Result<()>
    where
        C: Fn(ChangeEvent) + Send + Sync + 'static,
        F: FnOnce(EndEvent) + Send + 'static,
    {
        {
            let mut inner = self.inner.lock().await;
            match inner.state {
                MonitorState::Stopped => inner.state = MonitorState::Starting,
                _ => return Err(Error::AlreadyRunning),
            }
        }
        info!("Starting USB monitor");

        let initial = {
            let mut enumerator = self.enumerator.write().await;
            enumerator.enumerate()
        };
        let initial = match initial {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let mut inner = self.inner.lock().await;
                inner.state = MonitorState::Stopped;
                error!("Initial enumeration failed, start aborted: {e}");
                return Err(e);
            }
        };
        debug!("Initial snapshot holds {} devices", initial.len());

        let last_known = Arc::new(Mutex::new(initial));
        let on_change: ChangeHandler = Arc::new(on_change);
        let (shutdown_tx, join_handle) = listener::spawn(
            Arc::clone(&self.enumerator),
            Arc::clone(&last_known),
            on_change,
            self.poll_interval,
        );

        let mut inner = self.inner.lock().await;
        inner.session = Some(Session {
            shutdown_tx,
            join_handle,
            last_known,
            on_end: Some(Box::new(on_end)),
        });
        inner.state = MonitorState::Running;
        info!("USB monitor running");
        Ok(())
    }

    /// Stop the active monitoring session.
    ///
    /// Blocks the caller until the listener has drained any in-flight
    /// change callback, then invokes the end callback exactly once with
    /// the last-known snapshot. Rejects with [`Error::NotRunning`] when
    /// stopped and [`Error::Busy`] during a transient transition.
    pub async fn stop(&self) -> Result<()> {
        let mut session = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                MonitorState::Running => {}
                MonitorState::Stopped => return Err(Error::NotRunning),
                state => return Err(Error::Busy(state)),
            }
            inner.state = MonitorState::Stopping;
            match inner.session.take() {
                Some(session) => session,
                None => {
                    // Running without a session would be a bug; recover
                    // to a clean Stopped state.
                    inner.state = MonitorState::Stopped;
                    return Err(Error::NotRunning);
                }
            }
        };
        info!("Stopping USB monitor");

        let _ = session.shutdown_tx.send(()).await;
        if let Err(e) = session.join_handle.await {
            error!("Device listener task failed during shutdown: {e}");
        }

        let last_snapshot = session.last_known.lock().await.clone();
        if let Some(on_end) = session.on_end.take() {
            on_end(EndEvent { last_snapshot });
        }

        let mut inner = self.inner.lock().await;
        inner.state = MonitorState::Stopped;
        info!("USB monitor stopped");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::descriptor::DeviceDescriptor;
    use crate::enumerate::MockDeviceEnumerator;

    const TICK: Duration = Duration::from_millis(10);

    fn snapshot(ids: &[&str]) -> Snapshot {
        ids.iter()
            .map(|id| DeviceDescriptor::new(*id).with_mount_point(format!("/media/{id}")))
            .collect()
    }

    fn empty_enumerator() -> MockDeviceEnumerator {
        let mut mock = MockDeviceEnumerator::new();
        mock.expect_enumerate().returning(|| Ok(Snapshot::new()));
        mock
    }

    #[tokio::test]
    async fn test_start_stop_round_trip() {
        let monitor = UsbMonitor::with_enumerator(empty_enumerator()).with_interval(TICK);
        assert_eq!(monitor.state().await, MonitorState::Stopped);

        monitor.start(|_| {}, |_| {}).await.unwrap();
        assert_eq!(monitor.state().await, MonitorState::Running);

        monitor.stop().await.unwrap();
        assert_eq!(monitor.state().await, MonitorState::Stopped);
    }

    #[tokio::test]
    async fn test_double_start_rejected_and_state_stays_running() {
        let monitor = UsbMonitor::with_enumerator(empty_enumerator()).with_interval(TICK);
        monitor.start(|_| {}, |_| {}).await.unwrap();

        let second = monitor.start(|_| {}, |_| {}).await;
        assert!(matches!(second, Err(Error::AlreadyRunning)));
        assert_eq!(monitor.state().await, MonitorState::Running);

        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_without_start_rejected() {
        let monitor = UsbMonitor::with_enumerator(empty_enumerator()).with_interval(TICK);
        assert!(matches!(monitor.stop().await, Err(Error::NotRunning)));
        assert_eq!(monitor.state().await, MonitorState::Stopped);
    }

    #[tokio::test]
    async fn test_failed_initial_enumeration_resets_state() {
        let mut mock = MockDeviceEnumerator::new();
        mock.expect_enumerate()
            .returning(|| Err(Error::Enumeration("no privilege".into())));

        let monitor = UsbMonitor::with_enumerator(mock).with_interval(TICK);
        let result = monitor.start(|_| {}, |_| {}).await;
        assert!(matches!(result, Err(Error::Enumeration(_))));
        assert_eq!(monitor.state().await, MonitorState::Stopped);

        // The failed start must not poison the next session.
        assert!(matches!(monitor.stop().await, Err(Error::NotRunning)));
    }

    #[tokio::test]
    async fn test_end_event_carries_last_snapshot() {
        let mut mock = MockDeviceEnumerator::new();
        mock.expect_enumerate()
            .returning(|| Ok(snapshot(&["usb-a"])));

        let monitor = UsbMonitor::with_enumerator(mock).with_interval(TICK);
        let (end_tx, mut end_rx) = tokio::sync::mpsc::unbounded_channel();
        monitor
            .start(
                |_| {},
                move |end| {
                    let _ = end_tx.send(end);
                },
            )
            .await
            .unwrap();

        monitor.stop().await.unwrap();

        let end = end_rx.recv().await.unwrap();
        assert!(end.last_snapshot.contains("usb-a"));
        assert!(end_rx.recv().await.is_none(), "end must fire exactly once");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_during_startup_is_busy() {
        let mut mock = MockDeviceEnumerator::new();
        mock.expect_enumerate().returning(|| {
            // Keep the monitor in Starting long enough to observe it.
            std::thread::sleep(Duration::from_millis(200));
            Ok(Snapshot::new())
        });

        let monitor = Arc::new(UsbMonitor::with_enumerator(mock).with_interval(TICK));
        let starter = Arc::clone(&monitor);
        let start_task = tokio::spawn(async move { starter.start(|_| {}, |_| {}).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(monitor.state().await, MonitorState::Starting);
        assert!(matches!(monitor.stop().await, Err(Error::Busy(_))));
        assert!(matches!(
            monitor.start(|_| {}, |_| {}).await,
            Err(Error::AlreadyRunning)
        ));

        start_task.await.unwrap().unwrap();
        monitor.stop().await.unwrap();
    }
}
