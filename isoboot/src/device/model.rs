//! Block device records.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use crate::util::human_size;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Disk,
    Partition,
    /// rom, loop, lvm, crypt, ...
    Other,
}

impl From<&str> for DeviceKind {
    fn from(value: &str) -> Self {
        match value {
            "disk" => DeviceKind::Disk,
            "part" | "partition" => DeviceKind::Partition,
            _ => DeviceKind::Other,
        }
    }
}

/// One enumerated block device.
///
/// Identity is the device path: equality, ordering and hashing ignore the
/// other fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDevice {
    pub path: PathBuf,
    /// Capacity in bytes.
    pub size: u64,
    pub hotplug: bool,
    pub kind: DeviceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
}

impl BlockDevice {
    pub fn new(path: impl Into<PathBuf>, size: u64, hotplug: bool, kind: DeviceKind) -> Self {
        Self {
            path: path.into(),
            size,
            hotplug,
            kind,
            model: None,
            vendor: None,
        }
    }

    /// Hotplug-capable whole disk.
    pub fn is_candidate(&self) -> bool {
        self.hotplug && self.kind == DeviceKind::Disk
    }

    /// Vendor and model, whichever are known.
    pub fn description(&self) -> String {
        [self.vendor.as_deref(), self.model.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl PartialEq for BlockDevice {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for BlockDevice {}

impl PartialOrd for BlockDevice {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BlockDevice {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.cmp(&other.path)
    }
}

impl Hash for BlockDevice {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Display for BlockDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), human_size(self.size))?;
        let description = self.description();
        if !description.is_empty() {
            write!(f, " {}", description)?;
        }
        Ok(())
    }
}

/// Devices seen by one enumeration, ordered by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSnapshot {
    devices: BTreeSet<BlockDevice>,
}

impl DeviceSnapshot {
    pub fn new(devices: impl IntoIterator<Item = BlockDevice>) -> Self {
        Self {
            devices: devices.into_iter().collect(),
        }
    }

    pub fn devices(&self) -> impl Iterator<Item = &BlockDevice> {
        self.devices.iter()
    }

    /// Hotplug whole disks only.
    pub fn candidates(&self) -> impl Iterator<Item = &BlockDevice> {
        self.devices.iter().filter(|d| d.is_candidate())
    }

    pub fn get(&self, path: &std::path::Path) -> Option<&BlockDevice> {
        self.devices.iter().find(|d| d.path == path)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl FromIterator<BlockDevice> for DeviceSnapshot {
    fn from_iter<I: IntoIterator<Item = BlockDevice>>(iter: I) -> Self {
        Self::new(iter)
    }
}
