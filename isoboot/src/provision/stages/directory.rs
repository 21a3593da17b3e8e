//! Stage: image directory on the data partition.

use isoboot_shared::PartitionRole;
use isoboot_shared::errors::IsobootResult;

use super::StageContext;
use crate::mount::MountHandle;
use crate::partition::Filesystem;
use crate::tools::ToolCommand;

pub fn run(ctx: &StageContext<'_>) -> IsobootResult<()> {
    let data = MountHandle::mount(
        ctx.runner,
        &ctx.partition_path(PartitionRole::Data),
        &ctx.data_mount_point(),
        Filesystem::Ext2,
    )?;

    let image_dir = data
        .target()
        .join(ctx.options.image_dir.trim_matches('/'));
    ctx.runner.run_checked(
        &ToolCommand::new("mkdir")
            .arg("-p")
            .path_arg(&image_dir)
            .privileged(),
    )?;

    if ctx.options.chown_image_dir
        && let Some((uid, gid)) = ctx.owner
    {
        ctx.runner.run_checked(
            &ToolCommand::new("chown")
                .arg(format!("{}:{}", uid, gid))
                .path_arg(&image_dir)
                .privileged(),
        )?;
    }

    data.unmount()
}
