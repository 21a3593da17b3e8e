//! isoboot - multi-ISO boot drive provisioning.
//!
//! ## Architecture
//!
//! ```text
//! device::detect_new_device ──→ partition::PartitionPlanner ──→ provision::Provisioner
//!   (before/after snapshots)      (3-partition GPT plan)          (partition → format →
//!                                                                   BIOS → UEFI → config →
//!                                                                   image directory)
//! ```
//!
//! Every external program goes through [`tools::CommandRunner`]; privileged
//! ones are wrapped by [`tools::PrivilegeGate`]. Human checkpoints go through
//! [`operator::Operator`].
//!
//! The boot-time half lives in `isoboot-bootmenu` and only shares the layout
//! contract from `isoboot-shared`.

pub mod device;
pub mod mount;
pub mod operator;
pub mod options;
pub mod partition;
pub mod provision;
pub mod tools;
pub mod util;

pub use device::{BlockDevice, DeviceKind, DeviceSnapshot};
pub use isoboot_shared::{IsobootError, IsobootResult};
pub use options::IsobootOptions;
pub use partition::{PartitionPlan, PartitionPlanner};
pub use provision::{ProvisionReport, ProvisionState, Provisioner};
