//! Durable layout contract handed from provisioning to boot time.
//!
//! ```text
//! GPT
//! ├── 1  BIOS-boot   (no filesystem, bios_grub)
//! ├── 2  ESP         (FAT32, esp+boot)  /boot/grub/grub.cfg
//! └── 3  data        (ext2)             /isos/*.iso
//! ```
//!
//! Adding or removing bootable images means adding or removing files in
//! the image directory; no index or metadata file is maintained.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{boot, labels};

/// Fixed role of each of the three partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartitionRole {
    BiosBoot,
    EfiSystem,
    Data,
}

impl PartitionRole {
    pub const ALL: [PartitionRole; 3] = [
        PartitionRole::BiosBoot,
        PartitionRole::EfiSystem,
        PartitionRole::Data,
    ];

    /// 1-based GPT partition number.
    pub fn number(&self) -> u32 {
        match self {
            PartitionRole::BiosBoot => 1,
            PartitionRole::EfiSystem => 2,
            PartitionRole::Data => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionRole::BiosBoot => "bios-boot",
            PartitionRole::EfiSystem => "efi-system",
            PartitionRole::Data => "data",
        }
    }
}

impl fmt::Display for PartitionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names the boot menu needs to find its way around a provisioned device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedLayout {
    /// Label of the data partition, used to locate it at boot.
    pub data_label: String,
    /// Image directory name at the root of the data partition.
    pub image_dir: String,
    /// Nested configuration paths in probe order.
    pub nested_configs: Vec<String>,
    /// Variable carrying the chosen image path into the nested configuration.
    pub image_path_var: String,
}

impl ProvisionedLayout {
    /// Absolute image directory as seen from the data partition root.
    pub fn image_dir_path(&self) -> String {
        format!("/{}", self.image_dir.trim_matches('/'))
    }

    pub fn with_data_label(mut self, label: impl Into<String>) -> Self {
        self.data_label = label.into();
        self
    }

    pub fn with_image_dir(mut self, dir: impl Into<String>) -> Self {
        self.image_dir = dir.into();
        self
    }
}

impl Default for ProvisionedLayout {
    fn default() -> Self {
        Self {
            data_label: labels::DATA_LABEL.to_string(),
            image_dir: boot::IMAGE_DIR.to_string(),
            nested_configs: vec![
                boot::NESTED_CONFIG_PRIMARY.to_string(),
                boot::NESTED_CONFIG_ALTERNATE.to_string(),
            ],
            image_path_var: boot::IMAGE_PATH_VAR.to_string(),
        }
    }
}
