//! Device enumeration via `lsblk --json`.

use isoboot_shared::errors::{IsobootError, IsobootResult};
use serde::Deserialize;

use super::model::{BlockDevice, DeviceKind, DeviceSnapshot};
use crate::tools::{CommandRunner, ToolCommand};

/// Source of device snapshots.
pub trait Enumerator {
    fn snapshot(&self) -> IsobootResult<DeviceSnapshot>;
}

/// Enumerates top-level block devices with lsblk.
pub struct LsblkEnumerator<'r> {
    runner: &'r dyn CommandRunner,
}

impl<'r> LsblkEnumerator<'r> {
    pub fn new(runner: &'r dyn CommandRunner) -> Self {
        Self { runner }
    }

    pub fn command() -> ToolCommand {
        ToolCommand::new("lsblk").args([
            "--json",
            "--bytes",
            "--nodeps",
            "--output",
            "PATH,SIZE,HOTPLUG,TYPE,MODEL,VENDOR",
        ])
    }
}

impl Enumerator for LsblkEnumerator<'_> {
    fn snapshot(&self) -> IsobootResult<DeviceSnapshot> {
        let output = self.runner.run_checked(&Self::command())?;
        let snapshot = parse_lsblk_json(&output.stdout)?;
        tracing::debug!(
            devices = snapshot.len(),
            candidates = snapshot.candidates().count(),
            "Enumerated block devices"
        );
        Ok(snapshot)
    }
}

#[derive(Deserialize)]
struct LsblkOutput {
    blockdevices: Vec<LsblkDevice>,
}

#[derive(Deserialize)]
struct LsblkDevice {
    path: Option<String>,
    size: Option<Number>,
    hotplug: Option<Flag>,
    #[serde(rename = "type")]
    kind: Option<String>,
    model: Option<String>,
    vendor: Option<String>,
}

// Older util-linux prints numbers and booleans as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Int(u64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
    Text(String),
}

impl Flag {
    fn as_bool(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(n) => *n != 0,
            Flag::Text(s) => matches!(s.trim(), "1" | "true"),
        }
    }
}

/// Parse `lsblk --json --bytes` output.
pub fn parse_lsblk_json(json: &str) -> IsobootResult<DeviceSnapshot> {
    let output: LsblkOutput = serde_json::from_str(json)
        .map_err(|e| IsobootError::Storage(format!("Failed to parse lsblk output: {}", e)))?;

    let mut devices = Vec::with_capacity(output.blockdevices.len());
    for raw in output.blockdevices {
        let Some(path) = raw.path else {
            tracing::debug!("Skipping lsblk entry without a path");
            continue;
        };

        let size = match raw.size {
            Some(Number::Int(n)) => n,
            Some(Number::Text(s)) => s.trim().parse::<u64>().map_err(|e| {
                IsobootError::Storage(format!("Invalid size '{}' for {}: {}", s, path, e))
            })?,
            None => 0,
        };

        devices.push(BlockDevice {
            path: path.into(),
            size,
            hotplug: raw.hotplug.as_ref().is_some_and(Flag::as_bool),
            kind: raw.kind.as_deref().map(DeviceKind::from).unwrap_or(DeviceKind::Other),
            model: raw.model.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            vendor: raw.vendor.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        });
    }

    Ok(DeviceSnapshot::new(devices))
}
