//! Stage: filesystems on partitions 2 and 3.

use isoboot_shared::PartitionRole;
use isoboot_shared::errors::IsobootResult;

use super::StageContext;
use crate::tools::ToolCommand;

/// FAT32 on the ESP.
pub fn run_esp(ctx: &StageContext<'_>) -> IsobootResult<()> {
    let command = ToolCommand::new("mkfs.fat")
        .args(["-F", "32", "-n", ctx.options.esp_label.as_str()])
        .path_arg(&ctx.partition_path(PartitionRole::EfiSystem))
        .privileged();
    ctx.runner.run_checked(&command)?;
    Ok(())
}

/// ext2 on the data partition: no journal, fewer writes to flash.
pub fn run_data(ctx: &StageContext<'_>) -> IsobootResult<()> {
    let command = ToolCommand::new("mkfs.ext2")
        .args(["-F", "-L", ctx.options.data_label.as_str()])
        .path_arg(&ctx.partition_path(PartitionRole::Data))
        .privileged();
    ctx.runner.run_checked(&command)?;
    Ok(())
}
