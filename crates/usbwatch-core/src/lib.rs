//! `Usbwatch` Core Library
//!
//! This crate provides the device-monitoring engine behind `Usbwatch`:
//! - Continuous observation of USB mass-storage attach/detach activity
//! - Translation of raw OS device state into stable descriptors
//! - Snapshot diffing with added/removed/updated classification
//! - Safe start/stop lifecycle management of the background listener
//! - One-shot device queries, usable with or without active monitoring
//!
//! # Usage
//!
//! ```rust,ignore
//! use usbwatch_core::UsbMonitor;
//!
//! let monitor = UsbMonitor::new();
//! monitor
//!     .start(
//!         |change| println!("added: {}, removed: {}", change.added.len(), change.removed.len()),
//!         |end| println!("session ended with {} devices", end.last_snapshot.len()),
//!     )
//!     .await?;
//! // ... later ...
//! monitor.stop().await?;
//! ```
//!
//! # Error Handling
//!
//! Operations return the crate's typed [`Error`]; a lookup miss is
//! `Ok(None)` and a transient enumeration failure during monitoring is
//! contained inside the listener. See the [`error`] module.

pub mod descriptor;
pub mod diff;
pub mod enumerate;
pub mod error;
pub mod events;
pub mod listener;
pub mod monitor;
mod platform;
pub mod query;

pub use descriptor::{DeviceDescriptor, Snapshot};
pub use diff::diff;
pub use enumerate::{DeviceEnumerator, SysinfoEnumerator};
pub use error::{Error, Result};
pub use events::{ChangeEvent, ChangeHandler, EndEvent, EndHandler};
pub use listener::DEFAULT_POLL_INTERVAL;
pub use monitor::{MonitorState, UsbMonitor};
pub use query::{DeviceQuery, device_by_letter, list_devices};
