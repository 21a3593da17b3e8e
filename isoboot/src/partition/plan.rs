//! Three-partition plan computation.

use isoboot_shared::PartitionRole;
use isoboot_shared::constants::{geometry, labels};
use isoboot_shared::errors::{IsobootError, IsobootResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Fixed partition sizes and the data partition floor (MiB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanLimits {
    pub bios_boot_mib: u64,
    pub esp_mib: u64,
    pub min_data_mib: u64,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            bios_boot_mib: geometry::BIOS_BOOT_MIB,
            esp_mib: geometry::ESP_MIB,
            min_data_mib: geometry::MIN_DATA_MIB,
        }
    }
}

/// GPT partition names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionNames {
    pub bios_boot: String,
    pub esp: String,
    pub data: String,
}

impl Default for PartitionNames {
    fn default() -> Self {
        Self {
            bios_boot: labels::BIOS_BOOT_NAME.to_string(),
            esp: labels::ESP_NAME.to_string(),
            data: labels::DATA_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filesystem {
    Fat32,
    Ext2,
}

impl Filesystem {
    /// Filesystem type argument for `parted mkpart`.
    pub fn parted_type(&self) -> &'static str {
        match self {
            Filesystem::Fat32 => "fat32",
            Filesystem::Ext2 => "ext2",
        }
    }

    /// Type argument for `mount -t`.
    pub fn mount_type(&self) -> &'static str {
        match self {
            Filesystem::Fat32 => "vfat",
            Filesystem::Ext2 => "ext2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionFlag {
    BiosGrub,
    Esp,
    Boot,
}

impl PartitionFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionFlag::BiosGrub => "bios_grub",
            PartitionFlag::Esp => "esp",
            PartitionFlag::Boot => "boot",
        }
    }
}

/// One planned partition. Offsets are absolute MiB from the start of disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    pub number: u8,
    pub role: PartitionRole,
    pub name: String,
    pub filesystem: Option<Filesystem>,
    pub start_mib: u64,
    pub end_mib: u64,
    pub flags: Vec<PartitionFlag>,
}

impl PartitionSpec {
    pub fn size_mib(&self) -> u64 {
        self.end_mib - self.start_mib
    }

    pub fn start_arg(&self) -> String {
        format!("{}MiB", self.start_mib)
    }

    pub fn end_arg(&self) -> String {
        format!("{}MiB", self.end_mib)
    }
}

/// Usable MiB between the leading gap and the backup GPT.
pub fn usable_mib(capacity_bytes: u64) -> u64 {
    (capacity_bytes / geometry::MIB)
        .saturating_sub(geometry::LEADING_GAP_MIB)
        .saturating_sub(geometry::TRAILING_RESERVE_MIB)
}

/// Exactly three partitions: BIOS-boot, ESP, data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionPlan {
    pub capacity_bytes: u64,
    pub partitions: [PartitionSpec; 3],
}

impl PartitionPlan {
    pub fn partitions(&self) -> &[PartitionSpec; 3] {
        &self.partitions
    }

    pub fn get(&self, role: PartitionRole) -> &PartitionSpec {
        &self.partitions[(role.number() - 1) as usize]
    }

    pub fn bios_boot(&self) -> &PartitionSpec {
        self.get(PartitionRole::BiosBoot)
    }

    pub fn esp(&self) -> &PartitionSpec {
        self.get(PartitionRole::EfiSystem)
    }

    pub fn data(&self) -> &PartitionSpec {
        self.get(PartitionRole::Data)
    }

    /// Last MiB boundary a partition may end on.
    pub fn max_end_mib(&self) -> u64 {
        geometry::LEADING_GAP_MIB + usable_mib(self.capacity_bytes)
    }

    /// Check the structural invariants of the plan.
    pub fn validate(&self) -> IsobootResult<()> {
        let mut previous_end = geometry::LEADING_GAP_MIB;
        for (index, (spec, role)) in self.partitions.iter().zip(PartitionRole::ALL).enumerate() {
            if spec.role != role || spec.number as usize != index + 1 {
                return Err(IsobootError::InvalidState(format!(
                    "partition {} has role {} (expected {})",
                    spec.number, spec.role, role
                )));
            }
            if spec.start_mib < previous_end {
                return Err(IsobootError::InvalidState(format!(
                    "partition {} starts at {} MiB, before {} MiB",
                    spec.number, spec.start_mib, previous_end
                )));
            }
            if spec.end_mib <= spec.start_mib {
                return Err(IsobootError::InvalidState(format!(
                    "partition {} is empty ({}..{} MiB)",
                    spec.number, spec.start_mib, spec.end_mib
                )));
            }
            previous_end = spec.end_mib;
        }

        if previous_end > self.max_end_mib() {
            return Err(IsobootError::InvalidState(format!(
                "plan ends at {} MiB, beyond usable end {} MiB",
                previous_end,
                self.max_end_mib()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PartitionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for spec in &self.partitions {
            let flags: Vec<_> = spec.flags.iter().map(|f| f.as_str()).collect();
            writeln!(
                f,
                "{}  {:<6} {:<10} {:>8} MiB  [{} - {}]  {}  {}",
                spec.number,
                spec.name,
                spec.role,
                spec.size_mib(),
                spec.start_arg(),
                spec.end_arg(),
                spec.filesystem.map_or("-", |fs| fs.parted_type()),
                flags.join(",")
            )?;
        }
        Ok(())
    }
}

/// Computes partition plans for a device capacity.
#[derive(Debug, Clone, Default)]
pub struct PartitionPlanner {
    limits: PlanLimits,
    names: PartitionNames,
}

impl PartitionPlanner {
    pub fn new(limits: PlanLimits, names: PartitionNames) -> Self {
        Self { limits, names }
    }

    pub fn limits(&self) -> &PlanLimits {
        &self.limits
    }

    /// Permitted data partition sizes (MiB) on a device of this capacity.
    pub fn data_size_range(&self, capacity_bytes: u64) -> IsobootResult<RangeInclusive<u64>> {
        let usable = usable_mib(capacity_bytes);
        let fixed = self.limits.bios_boot_mib + self.limits.esp_mib;
        let max = usable.saturating_sub(fixed);

        if max < self.limits.min_data_mib {
            return Err(IsobootError::DeviceTooSmall {
                capacity_mib: usable,
                required_mib: fixed + self.limits.min_data_mib,
            });
        }
        Ok(self.limits.min_data_mib..=max)
    }

    /// Plan with the largest permitted data partition.
    pub fn plan_filling(&self, capacity_bytes: u64) -> IsobootResult<PartitionPlan> {
        let range = self.data_size_range(capacity_bytes)?;
        self.plan(capacity_bytes, *range.end())
    }

    /// Lay out the three partitions back to back from the leading gap.
    ///
    /// `data_mib` outside [`Self::data_size_range`] is rejected, never clamped.
    pub fn plan(&self, capacity_bytes: u64, data_mib: u64) -> IsobootResult<PartitionPlan> {
        let range = self.data_size_range(capacity_bytes)?;
        if !range.contains(&data_mib) {
            return Err(IsobootError::SizeOutOfRange {
                requested: data_mib,
                min: *range.start(),
                max: *range.end(),
            });
        }

        let start1 = geometry::LEADING_GAP_MIB;
        let end1 = start1 + self.limits.bios_boot_mib;
        let end2 = end1 + self.limits.esp_mib;
        let end3 = end2 + data_mib;

        let plan = PartitionPlan {
            capacity_bytes,
            partitions: [
                PartitionSpec {
                    number: 1,
                    role: PartitionRole::BiosBoot,
                    name: self.names.bios_boot.clone(),
                    filesystem: None,
                    start_mib: start1,
                    end_mib: end1,
                    flags: vec![PartitionFlag::BiosGrub],
                },
                PartitionSpec {
                    number: 2,
                    role: PartitionRole::EfiSystem,
                    name: self.names.esp.clone(),
                    filesystem: Some(Filesystem::Fat32),
                    start_mib: end1,
                    end_mib: end2,
                    flags: vec![PartitionFlag::Esp, PartitionFlag::Boot],
                },
                PartitionSpec {
                    number: 3,
                    role: PartitionRole::Data,
                    name: self.names.data.clone(),
                    filesystem: Some(Filesystem::Ext2),
                    start_mib: end2,
                    end_mib: end3,
                    flags: Vec::new(),
                },
            ],
        };

        plan.validate()?;
        tracing::debug!(
            capacity_bytes,
            data_mib,
            end_mib = end3,
            "Computed partition plan"
        );
        Ok(plan)
    }
}
