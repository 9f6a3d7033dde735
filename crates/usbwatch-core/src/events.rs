//! Events emitted by a monitoring session.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::descriptor::{DeviceDescriptor, Snapshot};

/// Delta between two consecutive snapshots, emitted on the change channel.
///
/// On a genuine transition at least one set is non-empty. `added` and
/// `removed` may both be non-empty within a single event when the OS
/// coalesces a fast unplug/replug. `updated` carries devices that stayed
/// connected while a descriptive attribute changed (e.g. a mount
/// designator reassignment); the payload is the current-side descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Devices present now but not in the previous snapshot.
    pub added: Vec<DeviceDescriptor>,
    /// Devices present previously but gone now.
    pub removed: Vec<DeviceDescriptor>,
    /// Devices present in both snapshots whose descriptive fields changed.
    pub updated: Vec<DeviceDescriptor>,
}

impl ChangeEvent {
    /// Whether the event carries no change at all. Empty events are
    /// suppressed by the listener and never reach a callback.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

/// Emitted exactly once when monitoring stops, after all change events
/// for the session have been delivered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndEvent {
    /// The last snapshot the session observed; empty if none was taken.
    pub last_snapshot: Snapshot,
}

/// Change callback invoked from the listener's background context.
///
/// Invocations are strictly ordered and never overlap: a slow callback
/// delays, but does not lose, the next notification.
pub type ChangeHandler = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// End callback, consumed exactly once per session.
pub type EndHandler = Box<dyn FnOnce(EndEvent) + Send>;
