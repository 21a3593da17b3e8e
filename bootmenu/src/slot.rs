//! Single loopback slot.
//!
//! The bootloader has few loopback slots, so at most one image is attached
//! at any time. An [`Attachment`] is the only way to hold the slot and it
//! detaches on drop.

use isoboot_shared::errors::{IsobootError, IsobootResult};

use crate::env::{BootEnvironment, LoopDevice};

/// Tracks whether the one loopback attachment is currently held.
#[derive(Debug, Default)]
pub struct LoopbackSlot {
    held: Option<LoopDevice>,
}

impl LoopbackSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_free(&self) -> bool {
        self.held.is_none()
    }

    /// Device currently holding the slot.
    pub fn held(&self) -> Option<&LoopDevice> {
        self.held.as_ref()
    }

    /// Attach `image`, failing with `LoopbackBusy` if the slot is taken.
    ///
    /// A slot whose previous detach failed stays busy.
    pub fn attach<'a, E: BootEnvironment>(
        &'a mut self,
        env: &'a mut E,
        image: &str,
    ) -> IsobootResult<Attachment<'a, E>> {
        if let Some(device) = &self.held {
            return Err(IsobootError::LoopbackBusy(device.to_string()));
        }

        let device = env.loopback_attach(image)?;
        tracing::debug!(device = %device.name, image = %image, "Loopback attached");
        self.held = Some(device.clone());

        Ok(Attachment {
            slot: self,
            env,
            device,
            released: false,
        })
    }
}

/// A held loopback attachment. Detaches on drop.
pub struct Attachment<'a, E: BootEnvironment> {
    slot: &'a mut LoopbackSlot,
    env: &'a mut E,
    device: LoopDevice,
    released: bool,
}

impl<'a, E: BootEnvironment> Attachment<'a, E> {
    pub fn device(&self) -> &LoopDevice {
        &self.device
    }

    /// Environment, for operations against the attached device.
    pub fn env(&mut self) -> &mut E {
        &mut *self.env
    }

    /// Explicitly detach. Called automatically on drop.
    pub fn release(mut self) -> IsobootResult<()> {
        self.do_release()
    }

    fn do_release(&mut self) -> IsobootResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        self.env.loopback_detach(&self.device)?;
        self.slot.held = None;
        tracing::debug!(device = %self.device.name, "Loopback detached");
        Ok(())
    }
}

impl<E: BootEnvironment> Drop for Attachment<'_, E> {
    fn drop(&mut self) {
        if let Err(e) = self.do_release() {
            tracing::warn!(
                device = %self.device.name,
                error = %e,
                "Failed to detach loopback device on drop"
            );
        }
    }
}
