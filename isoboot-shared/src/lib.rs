//! isoboot shared - code common to provisioning and boot time
//!
//! This crate contains the error type and the durable layout contract
//! that the provisioner writes and the boot menu later reads.

pub mod constants;
pub mod errors;
pub mod layout;

pub use errors::{IsobootError, IsobootResult};
pub use layout::{PartitionRole, ProvisionedLayout};
