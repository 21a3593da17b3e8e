//! Target device identification.
//!
//! The target is whatever hotplug disk appears between two enumerations.
//! Zero or several new disks is an error; isoboot never guesses.

mod enumerate;
mod model;
mod resolve;

pub use enumerate::{Enumerator, LsblkEnumerator, parse_lsblk_json};
pub use model::{BlockDevice, DeviceKind, DeviceSnapshot};
pub use resolve::{detect_new_device, resolve_new_device};
