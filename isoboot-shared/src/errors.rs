//! Error type shared by every isoboot crate.
//!
//! Errors fall into four families:
//! - ambiguous environment: [`IsobootError::NoDeviceDetected`], [`IsobootError::AmbiguousDevice`]
//! - privileged tool failure: [`IsobootError::ToolFailed`]
//! - input range: [`IsobootError::SizeOutOfRange`], [`IsobootError::DeviceTooSmall`]
//! - boot-time probe failure: [`IsobootError::Probe`]

use std::path::PathBuf;
use thiserror::Error;

pub type IsobootResult<T> = Result<T, IsobootError>;

#[derive(Debug, Error)]
pub enum IsobootError {
    /// No new hotplug disk appeared between the two enumerations.
    #[error("no new removable device detected")]
    NoDeviceDetected,

    /// More than one new hotplug disk appeared; refusing to pick one.
    #[error("ambiguous device: {} new removable devices appeared ({})", paths.len(), join_paths(paths))]
    AmbiguousDevice { paths: Vec<PathBuf> },

    /// Requested data partition size outside its permitted range (MiB).
    #[error("data partition size {requested} MiB out of range [{min}, {max}] MiB")]
    SizeOutOfRange { requested: u64, min: u64, max: u64 },

    /// Device cannot hold even the minimum layout.
    #[error("device too small: {capacity_mib} MiB usable, at least {required_mib} MiB required")]
    DeviceTooSmall { capacity_mib: u64, required_mib: u64 },

    /// An external tool exited unsuccessfully.
    #[error("{tool} failed with exit code {status:?}: {stderr}")]
    ToolFailed {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },

    /// Operator declined at a checkpoint.
    #[error("cancelled by operator: {0}")]
    Cancelled(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A loopback attachment is already held.
    #[error("loopback slot busy: {0} is still attached")]
    LoopbackBusy(String),

    #[error("probe: {0}")]
    Probe(String),

    #[error("storage: {0}")]
    Storage(String),

    #[error("config: {0}")]
    Config(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal: {0}")]
    Internal(String),
}

impl IsobootError {
    /// Zero or several candidate devices; identification must be redone.
    pub fn is_ambiguous_environment(&self) -> bool {
        matches!(
            self,
            IsobootError::NoDeviceDetected | IsobootError::AmbiguousDevice { .. }
        )
    }

    /// Operator input that can be corrected by prompting again.
    pub fn is_recoverable_input(&self) -> bool {
        matches!(self, IsobootError::SizeOutOfRange { .. })
    }

    pub fn tool_failed(
        tool: impl Into<String>,
        status: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        IsobootError::ToolFailed {
            tool: tool.into(),
            status,
            stderr: stderr.into(),
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
