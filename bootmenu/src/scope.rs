//! Restorable execution scope for one chain-load.
//!
//! Entering a scope attaches the chosen image, rebinds the active root to
//! it and exports the image path. Dropping the scope puts the previous root
//! back and then detaches, on every exit path.

use isoboot_shared::errors::IsobootResult;

use crate::env::{BootEnvironment, ChainOutcome};
use crate::menu::MenuEntry;
use crate::slot::{Attachment, LoopbackSlot};

pub struct ExecutionScope<'a, E: BootEnvironment> {
    // Root is restored in Drop::drop, before this field detaches.
    attachment: Attachment<'a, E>,
    previous_root: String,
    config: String,
}

impl<'a, E: BootEnvironment> ExecutionScope<'a, E> {
    /// Attach the entry's image and bind it as root.
    pub fn enter(
        slot: &'a mut LoopbackSlot,
        env: &'a mut E,
        entry: &MenuEntry,
        image_path_var: &str,
    ) -> IsobootResult<Self> {
        let mut attachment = slot.attach(env, &entry.image)?;
        let device = attachment.device().clone();

        let env = attachment.env();
        let previous_root = env.root();
        env.set_root(&device.name);
        env.export(image_path_var, &entry.image);

        tracing::debug!(
            image = %entry.image,
            root = %device.name,
            previous_root = %previous_root,
            "Entered execution scope"
        );

        Ok(Self {
            attachment,
            previous_root,
            config: entry.config.clone(),
        })
    }

    /// Root binding that will be restored on exit.
    pub fn previous_root(&self) -> &str {
        &self.previous_root
    }

    /// Run the nested configuration until it returns.
    pub fn chain_load(&mut self) -> ChainOutcome {
        let device = self.attachment.device().clone();
        let outcome = self.attachment.env().configfile(&device, &self.config);
        tracing::info!(image = %device.image, outcome = ?outcome, "Nested configuration returned");
        outcome
    }
}

impl<E: BootEnvironment> Drop for ExecutionScope<'_, E> {
    fn drop(&mut self) {
        let previous_root = std::mem::take(&mut self.previous_root);
        self.attachment.env().set_root(&previous_root);
        tracing::debug!(root = %previous_root, "Restored root after chain-load");
    }
}
