//! Device enumeration over the OS device tree.
//!
//! The [`DeviceEnumerator`] trait produces a complete [`Snapshot`] of
//! currently attached removable storage. The default implementation,
//! [`SysinfoEnumerator`], queries the OS disk list through `sysinfo` and
//! enriches each volume with best-effort USB hardware attributes.

use sysinfo::Disks;
use tracing::debug;

use crate::descriptor::{DeviceDescriptor, Snapshot};
use crate::error::Result;
use crate::platform;

/// Produces snapshots of currently attached USB mass-storage devices.
///
/// A device with unresolvable metadata is still included with those
/// fields absent, never dropped; only a systemic failure to query the
/// device tree yields [`crate::Error::Enumeration`].
#[cfg_attr(test, mockall::automock)]
pub trait DeviceEnumerator: Send + Sync {
    /// Take a fresh snapshot of all qualifying devices.
    fn enumerate(&mut self) -> Result<Snapshot>;

    /// Look up the device mounted at `designator`, case-insensitively.
    ///
    /// `Ok(None)` is the normal miss outcome, not an error.
    fn device_by_letter(&mut self, designator: &str) -> Result<Option<DeviceDescriptor>> {
        let snapshot = self.enumerate()?;
        Ok(snapshot.by_designator(designator).cloned())
    }
}

/// Default enumerator backed by `sysinfo`'s disk list.
pub struct SysinfoEnumerator {
    disks: Disks,
}

impl SysinfoEnumerator {
    /// Create an enumerator with a freshly refreshed disk list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
        }
    }

    /// Filter for disks that qualify as removable USB storage.
    fn is_removable_storage(disk: &sysinfo::Disk) -> bool {
        let mount_point = disk.mount_point().to_string_lossy();

        // On macOS external devices land under /Volumes, on Linux under
        // /media, /mnt or /run/media.
        let is_external_mount = mount_point.starts_with("/Volumes/")
            || mount_point.starts_with("/media/")
            || mount_point.starts_with("/mnt/")
            || mount_point.starts_with("/run/media/");

        if !(disk.is_removable() || is_external_mount) {
            return false;
        }

        // Skip system volumes on macOS.
        if mount_point == "/Volumes/Macintosh HD"
            || mount_point.contains("Recovery")
            || mount_point.contains("Preboot")
        {
            return false;
        }

        true
    }

    /// Resolve one disk into a descriptor. Metadata that cannot be
    /// resolved stays absent; this never fails.
    fn descriptor_for(disk: &sysinfo::Disk) -> DeviceDescriptor {
        let mount_point = disk.mount_point().to_path_buf();
        let attrs = platform::usb_attributes(&mount_point);

        // A hardware serial gives an identity that survives mount
        // designator reassignment; otherwise the mount path has to do.
        let device_id = attrs.serial_number.as_ref().map_or_else(
            || format!("mount:{}", mount_point.display()),
            |serial| format!("usb-serial:{serial}"),
        );

        let mut descriptor = DeviceDescriptor::new(device_id)
            .with_hardware_ids(attrs.vendor_id, attrs.product_id)
            .with_serial_number(attrs.serial_number)
            .with_mount_point(mount_point);

        let name = disk.name().to_string_lossy();
        if !name.is_empty() {
            descriptor = descriptor.with_friendly_name(name.to_string());
        }
        if disk.total_space() > 0 {
            descriptor = descriptor.with_capacity_bytes(disk.total_space());
        }
        descriptor
    }
}

impl Default for SysinfoEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceEnumerator for SysinfoEnumerator {
    fn enumerate(&mut self) -> Result<Snapshot> {
        self.disks.refresh(true);

        let snapshot: Snapshot = self
            .disks
            .iter()
            .filter(|disk| Self::is_removable_storage(disk))
            .map(Self::descriptor_for)
            .collect();

        debug!("Enumerated {} removable storage devices", snapshot.len());
        Ok(snapshot)
    }
}
