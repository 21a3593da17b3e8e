//! Stage: GPT partition table.

use isoboot_shared::errors::IsobootResult;

use super::StageContext;
use crate::partition::PartitionPlan;
use crate::tools::ToolCommand;

/// `parted --script` invocation creating the whole table in one call.
pub fn parted_command(device: &std::path::Path, plan: &PartitionPlan) -> ToolCommand {
    let mut command = ToolCommand::new("parted")
        .arg("--script")
        .path_arg(device)
        .args(["mklabel", "gpt"]);

    for spec in plan.partitions() {
        command = command.args(["mkpart", spec.name.as_str()]);
        if let Some(fs) = spec.filesystem {
            command = command.arg(fs.parted_type());
        }
        command = command.arg(spec.start_arg()).arg(spec.end_arg());
        let number = spec.number.to_string();
        for flag in &spec.flags {
            command = command.args(["set", number.as_str(), flag.as_str(), "on"]);
        }
    }
    command.privileged()
}

/// Write the partition table and have the kernel re-read it.
pub fn run(ctx: &StageContext<'_>) -> IsobootResult<()> {
    let device = &ctx.device.path;
    ctx.runner.run_checked(&parted_command(device, ctx.plan))?;
    ctx.runner
        .run_checked(&ToolCommand::new("partprobe").path_arg(device).privileged())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::PartitionPlanner;
    use std::path::Path;

    #[test]
    fn test_parted_script() {
        let plan = PartitionPlanner::default()
            .plan(8 * 1024 * 1024 * 1024, 4096)
            .unwrap();
        let command = parted_command(Path::new("/dev/sdb"), &plan);
        assert!(command.privileged);
        assert_eq!(
            command.to_string(),
            "parted --script /dev/sdb mklabel gpt \
             mkpart BIOS 1MiB 2MiB set 1 bios_grub on \
             mkpart EFI fat32 2MiB 52MiB set 2 esp on set 2 boot on \
             mkpart ISOS ext2 52MiB 4148MiB"
        );
    }
}
