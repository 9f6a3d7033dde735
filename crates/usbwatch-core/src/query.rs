//! One-shot device queries, independent of monitoring state.
//!
//! Queries always reflect current OS state: they re-enumerate on every
//! call and never read a monitoring session's last-known snapshot.

use crate::descriptor::{DeviceDescriptor, Snapshot};
use crate::enumerate::{DeviceEnumerator, SysinfoEnumerator};
use crate::error::Result;

/// List all currently attached qualifying devices.
pub fn list_devices(enumerator: &mut dyn DeviceEnumerator) -> Result<Snapshot> {
    enumerator.enumerate()
}

/// Look up the device mounted at `designator`, case-insensitively.
/// `Ok(None)` is the normal miss outcome.
pub fn device_by_letter(
    enumerator: &mut dyn DeviceEnumerator,
    designator: &str,
) -> Result<Option<DeviceDescriptor>> {
    enumerator.device_by_letter(designator)
}

/// Owned convenience wrapper over the default OS enumerator.
pub struct DeviceQuery {
    enumerator: SysinfoEnumerator,
}

impl DeviceQuery {
    /// Create a query service over the default OS enumerator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enumerator: SysinfoEnumerator::new(),
        }
    }

    /// List all currently attached qualifying devices.
    pub fn list_devices(&mut self) -> Result<Snapshot> {
        self.enumerator.enumerate()
    }

    /// Look up the device mounted at `designator`, case-insensitively.
    pub fn device_by_letter(&mut self, designator: &str) -> Result<Option<DeviceDescriptor>> {
        self.enumerator.device_by_letter(designator)
    }
}

impl Default for DeviceQuery {
    fn default() -> Self {
        Self::new()
    }
}
