//! Snapshot differencing.
//!
//! Pure set difference by device id, with an `updated` classification for
//! devices that stayed connected while a descriptive attribute changed.
//! No I/O; deterministic output (each set sorted by device id).

use crate::descriptor::Snapshot;
use crate::events::ChangeEvent;

/// Compute the delta between two snapshots.
///
/// `added` holds devices in `current` but not `previous`, `removed` the
/// reverse, both by device id. `updated` holds devices present in both
/// whose full descriptors differ, carrying the `current` side.
#[must_use]
pub fn diff(previous: &Snapshot, current: &Snapshot) -> ChangeEvent {
    let mut event = ChangeEvent::default();

    for device in current.iter() {
        match previous.get(&device.device_id) {
            None => event.added.push(device.clone()),
            Some(before) if before != device => event.updated.push(device.clone()),
            Some(_) => {}
        }
    }

    for device in previous.iter() {
        if !current.contains(&device.device_id) {
            event.removed.push(device.clone());
        }
    }

    event.added.sort_by_key(|d| d.device_id.clone());
    event.removed.sort_by_key(|d| d.device_id.clone());
    event.updated.sort_by_key(|d| d.device_id.clone());
    event
}
