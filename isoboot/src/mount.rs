//! Scoped filesystem mounts.
//!
//! A [`MountHandle`] is unmounted explicitly with [`MountHandle::unmount`]
//! on the success path. If a stage fails while the handle is alive, Drop
//! unmounts it and logs a warning instead of propagating.

use isoboot_shared::errors::IsobootResult;
use std::path::{Path, PathBuf};

use crate::partition::Filesystem;
use crate::tools::{CommandRunner, ToolCommand};

pub struct MountHandle<'r> {
    runner: &'r dyn CommandRunner,
    device: PathBuf,
    target: PathBuf,
    mounted: bool,
}

impl<'r> MountHandle<'r> {
    /// Mount `device` on `target`, creating the target directory first.
    pub fn mount(
        runner: &'r dyn CommandRunner,
        device: &Path,
        target: &Path,
        filesystem: Filesystem,
    ) -> IsobootResult<Self> {
        std::fs::create_dir_all(target)?;

        runner.run_checked(
            &ToolCommand::new("mount")
                .args(["-t", filesystem.mount_type()])
                .path_arg(device)
                .path_arg(target)
                .privileged(),
        )?;
        tracing::debug!(
            device = %device.display(),
            mount_point = %target.display(),
            "Mounted filesystem"
        );

        Ok(Self {
            runner,
            device: device.to_path_buf(),
            target: target.to_path_buf(),
            mounted: true,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    /// Unmount now, reporting failure to the caller.
    pub fn unmount(mut self) -> IsobootResult<()> {
        self.do_unmount()
    }

    fn do_unmount(&mut self) -> IsobootResult<()> {
        if !self.mounted {
            return Ok(());
        }
        // Cleared first so a failed umount is not retried from Drop.
        self.mounted = false;
        self.runner.run_checked(
            &ToolCommand::new("umount")
                .path_arg(&self.target)
                .privileged(),
        )?;
        tracing::debug!(mount_point = %self.target.display(), "Unmounted filesystem");
        Ok(())
    }
}

impl Drop for MountHandle<'_> {
    fn drop(&mut self) {
        if self.mounted
            && let Err(e) = self.do_unmount()
        {
            tracing::warn!(
                mount_point = %self.target.display(),
                error = %e,
                "Failed to unmount on cleanup"
            );
        }
    }
}
