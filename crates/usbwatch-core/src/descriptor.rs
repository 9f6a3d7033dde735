//! Canonical descriptors for attached USB mass-storage devices.
//!
//! A [`DeviceDescriptor`] is an immutable value object describing one
//! attached device. Identity is carried solely by [`DeviceDescriptor::device_id`];
//! every other field is descriptive and may be absent when the OS cannot
//! resolve it. A [`Snapshot`] is the complete set of descriptors observed
//! at one instant, keyed by device id.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identity and attributes of one attached USB storage device.
///
/// `device_id` is always present and is the sole identity key used when
/// diffing snapshots. It is unique per physical connection instance within
/// a session, but not guaranteed stable across host reboots for all
/// hardware. All other fields are best-effort.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Stable identifier derived from the OS device path or instance.
    pub device_id: String,
    /// USB vendor id, when the OS can resolve it.
    pub vendor_id: Option<u16>,
    /// USB product id, when the OS can resolve it.
    pub product_id: Option<u16>,
    /// Hardware serial number. Devices without one are still representable.
    pub serial_number: Option<String>,
    /// Assigned mount designator (drive letter or mount path), present
    /// only while the device is mounted with a filesystem.
    pub mount_point: Option<PathBuf>,
    /// Human-readable label.
    pub friendly_name: Option<String>,
    /// Total capacity in bytes, best-effort.
    pub capacity_bytes: Option<u64>,
}

impl DeviceDescriptor {
    /// Create a descriptor with only its identity set.
    #[must_use]
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            vendor_id: None,
            product_id: None,
            serial_number: None,
            mount_point: None,
            friendly_name: None,
            capacity_bytes: None,
        }
    }

    /// Set the vendor and product ids.
    #[must_use]
    pub fn with_hardware_ids(mut self, vendor_id: Option<u16>, product_id: Option<u16>) -> Self {
        self.vendor_id = vendor_id;
        self.product_id = product_id;
        self
    }

    /// Set the serial number.
    #[must_use]
    pub fn with_serial_number(mut self, serial_number: Option<String>) -> Self {
        self.serial_number = serial_number;
        self
    }

    /// Set the mount designator.
    #[must_use]
    pub fn with_mount_point(mut self, mount_point: impl Into<PathBuf>) -> Self {
        self.mount_point = Some(mount_point.into());
        self
    }

    /// Set the human-readable label.
    #[must_use]
    pub fn with_friendly_name(mut self, friendly_name: impl Into<String>) -> Self {
        self.friendly_name = Some(friendly_name.into());
        self
    }

    /// Set the total capacity in bytes.
    #[must_use]
    pub fn with_capacity_bytes(mut self, capacity_bytes: u64) -> Self {
        self.capacity_bytes = Some(capacity_bytes);
        self
    }

    /// Whether `other` refers to the same physical device (identity
    /// equality by `device_id`, ignoring descriptive fields).
    #[must_use]
    pub fn same_device(&self, other: &Self) -> bool {
        self.device_id == other.device_id
    }

    /// Whether the device is currently mounted with a filesystem.
    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.mount_point.is_some()
    }

    /// Case-insensitive match against a mount designator.
    ///
    /// Accepts a full mount path as well as drive-letter shorthand:
    /// `"E"`, `"e:"` and `"E:\"` all match a device mounted at `E:\`.
    #[must_use]
    pub fn matches_designator(&self, designator: &str) -> bool {
        let Some(mount_point) = &self.mount_point else {
            return false;
        };
        let query = designator.trim();
        if query.is_empty() {
            return false;
        }
        let mount = mount_point.to_string_lossy();
        if mount.eq_ignore_ascii_case(query) {
            return true;
        }
        // Drive-letter shorthand: strip trailing separators and the colon
        // from both sides before comparing.
        let mount_stem = mount.trim_end_matches(['\\', '/']).trim_end_matches(':');
        let query_stem = query.trim_end_matches(['\\', '/']).trim_end_matches(':');
        !mount_stem.is_empty() && mount_stem.eq_ignore_ascii_case(query_stem)
    }
}

/// The complete set of attached qualifying devices at one instant.
///
/// Keyed by device id; inserting a descriptor with an id already present
/// replaces the previous entry, so a snapshot never holds duplicates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    devices: HashMap<String, DeviceDescriptor>,
}

impl Snapshot {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor, returning the previous descriptor with the
    /// same device id if there was one.
    pub fn insert(&mut self, descriptor: DeviceDescriptor) -> Option<DeviceDescriptor> {
        self.devices.insert(descriptor.device_id.clone(), descriptor)
    }

    /// Number of devices in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the snapshot holds no devices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Whether a device with the given id is present.
    #[must_use]
    pub fn contains(&self, device_id: &str) -> bool {
        self.devices.contains_key(device_id)
    }

    /// Look up a device by id.
    #[must_use]
    pub fn get(&self, device_id: &str) -> Option<&DeviceDescriptor> {
        self.devices.get(device_id)
    }

    /// Iterate over the descriptors, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceDescriptor> {
        self.devices.values()
    }

    /// Look up the device whose mount designator matches `designator`,
    /// case-insensitively.
    #[must_use]
    pub fn by_designator(&self, designator: &str) -> Option<&DeviceDescriptor> {
        self.devices
            .values()
            .find(|device| device.matches_designator(designator))
    }
}

impl FromIterator<DeviceDescriptor> for Snapshot {
    fn from_iter<I: IntoIterator<Item = DeviceDescriptor>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for descriptor in iter {
            snapshot.insert(descriptor);
        }
        snapshot
    }
}
