//! GPT layout planning.
//!
//! ```text
//! | 1 MiB gap | p1 BIOS-boot | p2 ESP (FAT32) | p3 data (ext2) | 1 MiB backup GPT |
//! ```

mod naming;
mod plan;
mod size;

pub use naming::partition_device_path;
pub use plan::{
    Filesystem, PartitionFlag, PartitionNames, PartitionPlan, PartitionPlanner, PartitionSpec,
    PlanLimits, usable_mib,
};
pub use size::{SizeParseError, parse_size_mib};
