//! Best-effort resolution of USB hardware attributes for mounted volumes.
//!
//! On Linux the mount table maps a mount point to its block device node,
//! and the sysfs entry for that block device sits below the USB device
//! directory carrying `idVendor`, `idProduct` and `serial`. Resolution is
//! strictly best-effort: any step that fails leaves the attributes absent,
//! it never fails enumeration of the device itself.

use std::path::Path;
#[cfg(any(target_os = "linux", test))]
use std::path::PathBuf;

/// Hardware identity attributes resolved for one mounted volume.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct UsbAttributes {
    pub(crate) vendor_id: Option<u16>,
    pub(crate) product_id: Option<u16>,
    pub(crate) serial_number: Option<String>,
}

/// Resolve USB attributes for the volume mounted at `mount_point`.
#[cfg(target_os = "linux")]
pub(crate) fn usb_attributes(mount_point: &Path) -> UsbAttributes {
    resolve(
        Path::new("/proc/mounts"),
        Path::new("/sys/class/block"),
        mount_point,
    )
    .unwrap_or_default()
}

/// No per-volume attribute source is wired up on this platform; the
/// descriptor keeps its optional fields absent.
#[cfg(not(target_os = "linux"))]
pub(crate) fn usb_attributes(_mount_point: &Path) -> UsbAttributes {
    UsbAttributes::default()
}

#[cfg(any(target_os = "linux", test))]
fn resolve(mounts_table: &Path, class_block: &Path, mount_point: &Path) -> Option<UsbAttributes> {
    let device_node = device_node_for(mounts_table, mount_point)?;
    let name = device_node.file_name()?;
    let block_entry = class_block.join(name).canonicalize().ok()?;

    // Ascend from the block device towards its USB device directory, the
    // first ancestor that carries idVendor.
    for dir in block_entry.ancestors() {
        if dir.join("idVendor").is_file() {
            return Some(UsbAttributes {
                vendor_id: read_hex_u16(&dir.join("idVendor")),
                product_id: read_hex_u16(&dir.join("idProduct")),
                serial_number: read_trimmed(&dir.join("serial")),
            });
        }
    }
    None
}

/// Find the `/dev` node backing `mount_point` in the mount table.
#[cfg(any(target_os = "linux", test))]
fn device_node_for(mounts_table: &Path, mount_point: &Path) -> Option<PathBuf> {
    let table = std::fs::read_to_string(mounts_table).ok()?;
    let wanted = mount_point.to_string_lossy();

    for line in table.lines() {
        let mut fields = line.split_whitespace();
        let (Some(source), Some(target)) = (fields.next(), fields.next()) else {
            continue;
        };
        if !source.starts_with("/dev/") {
            continue;
        }
        if decode_mount_escapes(target) == wanted {
            return Some(PathBuf::from(source));
        }
    }
    None
}

/// Undo the octal escapes the kernel applies to mount table fields.
#[cfg(any(target_os = "linux", test))]
fn decode_mount_escapes(field: &str) -> String {
    field
        .replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}

#[cfg(any(target_os = "linux", test))]
fn read_hex_u16(path: &Path) -> Option<u16> {
    let raw = std::fs::read_to_string(path).ok()?;
    u16::from_str_radix(raw.trim(), 16).ok()
}

#[cfg(any(target_os = "linux", test))]
fn read_trimmed(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Build a fake sysfs tree: a USB device directory holding the id
    /// attributes, a block entry below it, and a `class/block` symlink
    /// pointing at that entry, mirroring the real layout.
    #[cfg(unix)]
    fn fake_sysfs(root: &Path, serial: Option<&str>) -> (PathBuf, PathBuf) {
        let usb_device = root.join("sys/devices/pci0000:00/usb1/1-4");
        let block_entry = usb_device.join("1-4:1.0/host2/target2:0:0/2:0:0:0/block/sdb/sdb1");
        fs::create_dir_all(&block_entry).unwrap();
        fs::write(usb_device.join("idVendor"), "0781\n").unwrap();
        fs::write(usb_device.join("idProduct"), "5583\n").unwrap();
        if let Some(serial) = serial {
            fs::write(usb_device.join("serial"), format!("{serial}\n")).unwrap();
        }

        let class_block = root.join("sys/class/block");
        fs::create_dir_all(&class_block).unwrap();
        std::os::unix::fs::symlink(&block_entry, class_block.join("sdb1")).unwrap();

        let mounts = root.join("mounts");
        fs::write(&mounts, "/dev/sdb1 /media/usb0 vfat rw,relatime 0 0\n").unwrap();
        (mounts, class_block)
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_attributes_through_block_symlink() {
        let tmp = TempDir::new().unwrap();
        let (mounts, class_block) = fake_sysfs(tmp.path(), Some("4C530001"));

        let attrs = resolve(&mounts, &class_block, Path::new("/media/usb0")).unwrap();
        assert_eq!(attrs.vendor_id, Some(0x0781));
        assert_eq!(attrs.product_id, Some(0x5583));
        assert_eq!(attrs.serial_number.as_deref(), Some("4C530001"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_without_serial_keeps_ids() {
        let tmp = TempDir::new().unwrap();
        let (mounts, class_block) = fake_sysfs(tmp.path(), None);

        let attrs = resolve(&mounts, &class_block, Path::new("/media/usb0")).unwrap();
        assert_eq!(attrs.vendor_id, Some(0x0781));
        assert!(attrs.serial_number.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_unknown_mount_point() {
        let tmp = TempDir::new().unwrap();
        let (mounts, class_block) = fake_sysfs(tmp.path(), None);

        assert!(resolve(&mounts, &class_block, Path::new("/media/other")).is_none());
    }

    #[test]
    fn test_device_node_skips_virtual_filesystems() {
        let tmp = TempDir::new().unwrap();
        let mounts = tmp.path().join("mounts");
        fs::write(&mounts, "tmpfs /run tmpfs rw 0 0\n/dev/sda1 /boot ext4 rw 0 0\n").unwrap();

        assert!(device_node_for(&mounts, Path::new("/run")).is_none());
        assert_eq!(
            device_node_for(&mounts, Path::new("/boot")),
            Some(PathBuf::from("/dev/sda1"))
        );
    }

    #[test]
    fn test_device_node_decodes_escaped_mount_point() {
        let tmp = TempDir::new().unwrap();
        let mounts = tmp.path().join("mounts");
        fs::write(&mounts, "/dev/sdc1 /media/MY\\040STICK vfat rw 0 0\n").unwrap();

        assert_eq!(
            device_node_for(&mounts, Path::new("/media/MY STICK")),
            Some(PathBuf::from("/dev/sdc1"))
        );
    }

    #[test]
    fn test_read_hex_rejects_garbage() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("idVendor");
        fs::write(&path, "not-hex\n").unwrap();
        assert!(read_hex_u16(&path).is_none());
    }
}
