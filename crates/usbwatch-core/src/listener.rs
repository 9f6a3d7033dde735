//! Background listener bridging OS device-change observation to snapshot
//! diffing.
//!
//! One listener task runs per monitoring session. It waits for
//! device-change wakeups (this implementation's notification source is a
//! periodic tick), re-enumerates, diffs against the session's last-known
//! snapshot and delivers a [`ChangeEvent`] when the delta is non-empty.
//! Callbacks run on the listener task itself, so invocations are strictly
//! ordered and never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::descriptor::Snapshot;
use crate::diff::diff;
use crate::enumerate::DeviceEnumerator;
use crate::events::ChangeHandler;

/// Default interval between device-change observations (2 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Spawn the listener task for one session.
///
/// Returns the shutdown sender and the task handle; the controller joins
/// the handle on `stop` so any in-flight callback drains before the end
/// callback fires.
pub(crate) fn spawn<E>(
    enumerator: Arc<RwLock<E>>,
    last_known: Arc<Mutex<Snapshot>>,
    on_change: ChangeHandler,
    poll_interval: Duration,
) -> (mpsc::Sender<()>, JoinHandle<()>)
where
    E: DeviceEnumerator + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    let handle = tokio::spawn(async move {
        let mut ticker = interval(poll_interval);
        // A slow callback delays the next observation instead of
        // bursting to catch up.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!("Device listener shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let current = {
                        let mut enumerator = enumerator.write().await;
                        enumerator.enumerate()
                    };

                    match current {
                        Ok(current) => {
                            let mut last_known = last_known.lock().await;
                            let event = diff(&last_known, &current);
                            if event.is_empty() {
                                // Coalesced or repeated notification with
                                // no actual attach/detach.
                                continue;
                            }
                            info!(
                                added = event.added.len(),
                                removed = event.removed.len(),
                                updated = event.updated.len(),
                                "Device change detected"
                            );
                            on_change(event);
                            *last_known = current;
                        }
                        Err(e) => {
                            // Transient miss: keep the previous snapshot so
                            // the next successful enumeration diffs against
                            // real state, not an empty one.
                            warn!("Enumeration failed, retaining last snapshot: {e}");
                        }
                    }
                }
            }
        }
    });

    (shutdown_tx, handle)
}
