//! Stage: boot configuration onto the ESP.

use isoboot_bootmenu::script;
use isoboot_shared::PartitionRole;
use isoboot_shared::constants::boot;
use isoboot_shared::errors::{IsobootError, IsobootResult};

use super::StageContext;
use crate::mount::MountHandle;
use crate::options::IsobootOptions;
use crate::partition::Filesystem;
use crate::tools::ToolCommand;

/// The configuration to install: the configured file, or the rendered menu.
pub fn boot_config_text(options: &IsobootOptions) -> IsobootResult<String> {
    match &options.boot_config {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            IsobootError::Config(format!(
                "Failed to read boot config {}: {}",
                path.display(),
                e
            ))
        }),
        None => Ok(script::render(&options.script_options())),
    }
}

pub fn run(ctx: &StageContext<'_>) -> IsobootResult<()> {
    let staged = ctx.work_dir.join("grub.cfg");
    std::fs::write(&staged, boot_config_text(ctx.options)?)?;

    let esp = MountHandle::mount(
        ctx.runner,
        &ctx.partition_path(PartitionRole::EfiSystem),
        &ctx.esp_mount_point(),
        Filesystem::Fat32,
    )?;
    let destination = esp
        .target()
        .join(boot::CONFIG_PATH.trim_start_matches('/'));
    ctx.runner.run_checked(
        &ToolCommand::new("install")
            .args(["-D", "-m", "0644"])
            .path_arg(&staged)
            .path_arg(&destination)
            .privileged(),
    )?;
    tracing::info!(destination = %destination.display(), "Installed boot configuration");
    esp.unmount()
}
