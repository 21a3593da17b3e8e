//! Provisioning stages.
//!
//! Each stage is a function over a shared [`StageContext`] that delegates
//! to one or two external tools. Stages do ONE thing and are never retried.
//!
//! ```text
//! partition ──→ format_esp ──→ format_data ──→ install_bios ──→ install_uefi
//!     ──→ install_config ──→ create_directory
//! ```

pub mod bootloader;
pub mod config;
pub mod directory;
pub mod format;
pub mod partition;

use isoboot_shared::PartitionRole;
use isoboot_shared::errors::IsobootResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::state::ProvisionState;
use crate::device::BlockDevice;
use crate::options::IsobootOptions;
use crate::partition::{PartitionPlan, partition_device_path};
use crate::tools::CommandRunner;

/// Everything a stage may read.
pub struct StageContext<'a> {
    pub runner: &'a dyn CommandRunner,
    pub device: &'a BlockDevice,
    pub plan: &'a PartitionPlan,
    pub options: &'a IsobootOptions,
    /// Scratch directory for mount points and staged files.
    pub work_dir: &'a Path,
    /// Owner for the image directory, if it should be handed over.
    pub owner: Option<(u32, u32)>,
}

impl StageContext<'_> {
    pub fn partition_path(&self, role: PartitionRole) -> PathBuf {
        partition_device_path(&self.device.path, self.plan.get(role).number)
    }

    pub fn esp_mount_point(&self) -> PathBuf {
        self.work_dir.join("esp")
    }

    pub fn data_mount_point(&self) -> PathBuf {
        self.work_dir.join("data")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Partition,
    FormatEsp,
    FormatData,
    InstallBios,
    InstallUefi,
    InstallConfig,
    CreateDirectory,
}

impl Stage {
    /// Execution order.
    pub const ALL: [Stage; 7] = [
        Stage::Partition,
        Stage::FormatEsp,
        Stage::FormatData,
        Stage::InstallBios,
        Stage::InstallUefi,
        Stage::InstallConfig,
        Stage::CreateDirectory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Partition => "partition",
            Stage::FormatEsp => "format-esp",
            Stage::FormatData => "format-data",
            Stage::InstallBios => "install-bios",
            Stage::InstallUefi => "install-uefi",
            Stage::InstallConfig => "install-config",
            Stage::CreateDirectory => "create-directory",
        }
    }

    /// State reached once this stage succeeds, if it completes one.
    pub fn completes(&self) -> Option<ProvisionState> {
        match self {
            Stage::Partition => Some(ProvisionState::Partitioned),
            Stage::FormatEsp => None,
            Stage::FormatData => Some(ProvisionState::Formatted),
            Stage::InstallBios => Some(ProvisionState::BiosInstalled),
            Stage::InstallUefi => Some(ProvisionState::UefiInstalled),
            Stage::InstallConfig => Some(ProvisionState::ConfigInstalled),
            Stage::CreateDirectory => Some(ProvisionState::DirectoryReady),
        }
    }

    pub fn run(&self, ctx: &StageContext<'_>) -> IsobootResult<()> {
        match self {
            Stage::Partition => partition::run(ctx),
            Stage::FormatEsp => format::run_esp(ctx),
            Stage::FormatData => format::run_data(ctx),
            Stage::InstallBios => bootloader::run_bios(ctx),
            Stage::InstallUefi => bootloader::run_uefi(ctx),
            Stage::InstallConfig => config::run(ctx),
            Stage::CreateDirectory => directory::run(ctx),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
