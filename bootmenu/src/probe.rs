//! Probing a candidate image for a nested configuration.

use isoboot_shared::ProvisionedLayout;

use crate::env::BootEnvironment;
use crate::scan::ImageCandidate;
use crate::slot::LoopbackSlot;

/// Result of probing one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A nested configuration was found.
    Attachable {
        config: String,
        label: Option<String>,
    },
    /// The candidate cannot be chain-loaded and is left out of the menu.
    Skippable { reason: String },
}

impl ProbeOutcome {
    pub fn is_attachable(&self) -> bool {
        matches!(self, ProbeOutcome::Attachable { .. })
    }
}

/// Attach `candidate`, look for a nested configuration in probe order and
/// detach again.
///
/// The slot is free again when this returns, whatever the outcome.
pub fn probe<E: BootEnvironment>(
    slot: &mut LoopbackSlot,
    env: &mut E,
    candidate: &ImageCandidate,
    layout: &ProvisionedLayout,
) -> ProbeOutcome {
    let mut attachment = match slot.attach(env, &candidate.path) {
        Ok(attachment) => attachment,
        Err(e) => {
            return ProbeOutcome::Skippable {
                reason: format!("cannot attach {}: {}", candidate.path, e),
            };
        }
    };

    let device = attachment.device().clone();
    let label = attachment.env().probe_label(&device);
    tracing::info!(
        image = %candidate.path,
        label = label.as_deref().unwrap_or("<none>"),
        "Probing image"
    );

    let config = layout
        .nested_configs
        .iter()
        .find(|path| attachment.env().file_exists(&device, path))
        .cloned();

    if let Err(e) = attachment.release() {
        tracing::warn!(image = %candidate.path, error = %e, "Failed to detach after probe");
    }

    match config {
        Some(config) => ProbeOutcome::Attachable { config, label },
        None => ProbeOutcome::Skippable {
            reason: format!(
                "no boot configuration found in {} (looked for {})",
                candidate.path,
                layout.nested_configs.join(", ")
            ),
        },
    }
}
