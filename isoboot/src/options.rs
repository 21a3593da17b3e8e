//! Configuration for isoboot.

use isoboot_bootmenu::ProbeFailurePolicy;
use isoboot_bootmenu::script::ScriptOptions;
use isoboot_shared::ProvisionedLayout;
use isoboot_shared::constants::{boot, envs, grub, labels};
use isoboot_shared::errors::{IsobootError, IsobootResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::partition::{PartitionNames, PartitionPlanner, PlanLimits};

// ============================================================================
// Options
// ============================================================================

/// Provisioning and boot menu options.
///
/// Every field has a default, so an empty YAML document is a valid
/// configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IsobootOptions {
    /// GPT partition names.
    #[serde(default)]
    pub partition_names: PartitionNames,

    /// Fixed partition sizes and the data partition floor.
    #[serde(default)]
    pub limits: PlanLimits,

    /// FAT volume label of the ESP (at most 11 characters).
    #[serde(default = "default_esp_label")]
    pub esp_label: String,

    /// ext2 label of the data partition. The boot menu searches for it.
    #[serde(default = "default_data_label")]
    pub data_label: String,

    /// Image directory at the root of the data partition.
    #[serde(default = "default_image_dir")]
    pub image_dir: String,

    #[serde(default)]
    pub grub: GrubOptions,

    /// Install this file as the boot configuration instead of rendering one.
    #[serde(default)]
    pub boot_config: Option<PathBuf>,

    /// Boot menu timeout in seconds. `None` waits forever.
    #[serde(default = "default_menu_timeout")]
    pub menu_timeout_secs: Option<u32>,

    /// Hand the image directory to the invoking user so images can be
    /// copied without privileges.
    ///
    /// Default: true
    #[serde(default = "default_chown_image_dir")]
    pub chown_image_dir: bool,

    /// Behaviour when an image has no nested configuration.
    #[serde(default)]
    pub probe_failure: ProbeFailurePolicy,
}

/// Bootloader installer targets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrubOptions {
    #[serde(default = "default_bios_target")]
    pub bios_target: String,

    #[serde(default = "default_uefi_target")]
    pub uefi_target: String,

    /// `grub-install` executable (some distributions ship `grub2-install`).
    #[serde(default = "default_grub_install")]
    pub install_program: String,
}

impl Default for GrubOptions {
    fn default() -> Self {
        Self {
            bios_target: default_bios_target(),
            uefi_target: default_uefi_target(),
            install_program: default_grub_install(),
        }
    }
}

fn default_esp_label() -> String {
    labels::ESP_LABEL.to_string()
}

fn default_data_label() -> String {
    labels::DATA_LABEL.to_string()
}

fn default_image_dir() -> String {
    boot::IMAGE_DIR.to_string()
}

fn default_menu_timeout() -> Option<u32> {
    Some(10)
}

fn default_chown_image_dir() -> bool {
    true
}

fn default_bios_target() -> String {
    grub::BIOS_TARGET.to_string()
}

fn default_uefi_target() -> String {
    grub::UEFI_TARGET.to_string()
}

fn default_grub_install() -> String {
    "grub-install".to_string()
}

impl Default for IsobootOptions {
    fn default() -> Self {
        Self {
            partition_names: PartitionNames::default(),
            limits: PlanLimits::default(),
            esp_label: default_esp_label(),
            data_label: default_data_label(),
            image_dir: default_image_dir(),
            grub: GrubOptions::default(),
            boot_config: None,
            menu_timeout_secs: default_menu_timeout(),
            chown_image_dir: default_chown_image_dir(),
            probe_failure: ProbeFailurePolicy::default(),
        }
    }
}

const FAT_LABEL_MAX: usize = 11;

impl IsobootOptions {
    /// Parse and validate a YAML configuration file.
    pub fn load(path: &Path) -> IsobootResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            IsobootError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let options = Self::from_yaml(&text)
            .map_err(|e| IsobootError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(options)
    }

    pub fn from_yaml(text: &str) -> IsobootResult<Self> {
        // An empty document deserializes to unit, not to a map.
        let options: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text).map_err(|e| IsobootError::Config(e.to_string()))?
        };
        options.validate()?;
        Ok(options)
    }

    /// Where to look for the configuration file, in priority order:
    /// explicit path, `$ISOBOOT_CONFIG`, `<config dir>/isoboot/config.yaml`.
    pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(envs::ISOBOOT_CONFIG)
            && !path.is_empty()
        {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("isoboot").join("config.yaml"))
    }

    /// Load from [`Self::config_path`], falling back to defaults when no
    /// implicit configuration file exists. A missing explicit file is an
    /// error.
    pub fn discover(explicit: Option<&Path>) -> IsobootResult<Self> {
        match Self::config_path(explicit) {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) if explicit.is_some() => Err(IsobootError::Config(format!(
                "configuration file {} does not exist",
                path.display()
            ))),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> IsobootResult<()> {
        let names = [
            ("partition_names.bios_boot", &self.partition_names.bios_boot),
            ("partition_names.esp", &self.partition_names.esp),
            ("partition_names.data", &self.partition_names.data),
            ("esp_label", &self.esp_label),
            ("data_label", &self.data_label),
            ("grub.bios_target", &self.grub.bios_target),
            ("grub.uefi_target", &self.grub.uefi_target),
            ("grub.install_program", &self.grub.install_program),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(IsobootError::Config(format!("{} must not be empty", field)));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(IsobootError::Config(format!(
                    "{} must not contain whitespace: '{}'",
                    field, value
                )));
            }
        }

        if self.esp_label.len() > FAT_LABEL_MAX {
            return Err(IsobootError::Config(format!(
                "esp_label '{}' is longer than {} characters",
                self.esp_label, FAT_LABEL_MAX
            )));
        }

        if self.image_dir.trim_matches('/').is_empty() || self.image_dir.contains(' ') {
            return Err(IsobootError::Config(format!(
                "image_dir '{}' is not a usable directory name",
                self.image_dir
            )));
        }

        let sizes = [
            ("limits.bios_boot_mib", self.limits.bios_boot_mib),
            ("limits.esp_mib", self.limits.esp_mib),
            ("limits.min_data_mib", self.limits.min_data_mib),
        ];
        for (field, value) in sizes {
            if value == 0 {
                return Err(IsobootError::Config(format!("{} must be positive", field)));
            }
        }
        Ok(())
    }

    pub fn planner(&self) -> PartitionPlanner {
        PartitionPlanner::new(self.limits, self.partition_names.clone())
    }

    /// The contract the boot menu reads.
    pub fn layout(&self) -> ProvisionedLayout {
        ProvisionedLayout::default()
            .with_data_label(self.data_label.clone())
            .with_image_dir(self.image_dir.trim_matches('/').to_string())
    }

    pub fn script_options(&self) -> ScriptOptions {
        ScriptOptions {
            layout: self.layout(),
            timeout_secs: self.menu_timeout_secs,
        }
    }

    pub fn to_yaml(&self) -> IsobootResult<String> {
        serde_yaml::to_string(self).map_err(|e| IsobootError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(IsobootOptions::from_yaml("").unwrap(), IsobootOptions::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let options = IsobootOptions::from_yaml(
            "data_label: usbdata\nlimits:\n  esp_mib: 100\n  bios_boot_mib: 1\n  min_data_mib: 512\nprobe_failure: silent-skip\n",
        )
        .unwrap();
        assert_eq!(options.data_label, "usbdata");
        assert_eq!(options.limits.esp_mib, 100);
        assert_eq!(options.esp_label, labels::ESP_LABEL);
        assert_eq!(options.probe_failure, ProbeFailurePolicy::SilentSkip);
        assert_eq!(options.layout().data_label, "usbdata");
    }

    #[test]
    fn test_rejects_long_fat_label() {
        let err = IsobootOptions::from_yaml("esp_label: WAYTOOLONGLABEL\n").unwrap_err();
        assert!(matches!(err, IsobootError::Config(ref m) if m.contains("esp_label")));
    }

    #[test]
    fn test_rejects_empty_label() {
        assert!(IsobootOptions::from_yaml("data_label: ''\n").is_err());
    }

    #[test]
    fn test_rejects_zero_size() {
        let yaml = "limits:\n  bios_boot_mib: 1\n  esp_mib: 0\n  min_data_mib: 256\n";
        assert!(IsobootOptions::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_rejects_unknown_policy() {
        assert!(IsobootOptions::from_yaml("probe_failure: explode\n").is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let options = IsobootOptions::default();
        let yaml = options.to_yaml().unwrap();
        assert_eq!(IsobootOptions::from_yaml(&yaml).unwrap(), options);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(IsobootOptions::discover(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "image_dir: images\nchown_image_dir: false\n").unwrap();
        let options = IsobootOptions::discover(Some(&path)).unwrap();
        assert_eq!(options.layout().image_dir_path(), "/images");
        assert!(!options.chown_image_dir);
    }
}
