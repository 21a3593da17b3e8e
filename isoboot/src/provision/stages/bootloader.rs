//! Stage: GRUB for legacy BIOS and for UEFI.
//!
//! Both installs share `<esp>/boot` so one configuration serves both.

use isoboot_shared::PartitionRole;
use isoboot_shared::constants::boot;
use isoboot_shared::errors::IsobootResult;

use super::StageContext;
use crate::mount::MountHandle;
use crate::partition::Filesystem;
use crate::tools::ToolCommand;

fn mount_esp<'a>(ctx: &StageContext<'a>) -> IsobootResult<MountHandle<'a>> {
    MountHandle::mount(
        ctx.runner,
        &ctx.partition_path(PartitionRole::EfiSystem),
        &ctx.esp_mount_point(),
        Filesystem::Fat32,
    )
}

fn boot_directory_arg(esp: &std::path::Path) -> String {
    format!("--boot-directory={}", esp.join(boot::BOOT_DIR).display())
}

/// core.img into the BIOS-boot partition, modules into the ESP.
pub fn run_bios(ctx: &StageContext<'_>) -> IsobootResult<()> {
    let esp = mount_esp(ctx)?;
    let command = ToolCommand::new(ctx.options.grub.install_program.as_str())
        .arg(format!("--target={}", ctx.options.grub.bios_target))
        .args(["--recheck", "--removable"])
        .arg(boot_directory_arg(esp.target()))
        .path_arg(&ctx.device.path)
        .privileged();
    ctx.runner.run_checked(&command)?;
    esp.unmount()
}

/// Fallback loader at `EFI/BOOT/BOOTX64.EFI` on the ESP.
pub fn run_uefi(ctx: &StageContext<'_>) -> IsobootResult<()> {
    let esp = mount_esp(ctx)?;
    let command = ToolCommand::new(ctx.options.grub.install_program.as_str())
        .arg(format!("--target={}", ctx.options.grub.uefi_target))
        .args(["--recheck", "--removable"])
        .arg(format!("--efi-directory={}", esp.target().display()))
        .arg(boot_directory_arg(esp.target()))
        .privileged();
    ctx.runner.run_checked(&command)?;
    esp.unmount()
}
