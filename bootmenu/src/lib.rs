//! Boot menu resolution for isoboot drives.
//!
//! Runs once per boot inside the bootloader's runtime, abstracted here as
//! [`BootEnvironment`]:
//!
//! ```text
//! Idle → Scanning → {Probing → Skippable | Attachable}* → MenuBuilt
//!      → Selected → ChainLoading → ReturnedToMenu | Halted | Rebooted
//! ```
//!
//! Only the durable layout contract from `isoboot-shared` is consumed; the
//! provisioning side is never called at boot.
//!
//! [`script`] renders the same state machine as the GRUB configuration that
//! is installed on the drive.

pub mod env;
#[cfg(target_os = "linux")]
pub mod host;
pub mod menu;
pub mod probe;
pub mod resolver;
pub mod scan;
pub mod scope;
pub mod script;
pub mod slot;

pub use env::{BootEnvironment, ChainOutcome, LoopDevice};
pub use menu::{Menu, MenuEntry, MenuItem};
pub use probe::ProbeOutcome;
pub use resolver::{BootExit, BootMenuResolver, MenuSelector, ProbeFailurePolicy, ResolverState, Selection};
pub use scan::ImageCandidate;
pub use scope::ExecutionScope;
pub use slot::{Attachment, LoopbackSlot};
