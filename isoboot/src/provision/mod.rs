//! Provisioning orchestration.
//!
//! ```text
//! session ──→ Provisioner::run
//!               partition → format_esp → format_data → install_bios
//!               → install_uefi → install_config → create_directory
//! ```
//!
//! Every mount is scoped by [`crate::mount::MountHandle`], so a failing
//! stage never leaves a partition mounted.

mod orchestrator;
mod session;
mod state;
pub mod stages;

pub use orchestrator::{ProvisionReport, Provisioner, StageMetrics};
pub use session::{
    DeviceSource, SessionRequest, acquire_privilege, confirm_destructive, prepare_plan,
    run_session,
};
pub use stages::Stage;
pub use state::{ProvisionState, ProvisionStatus};
