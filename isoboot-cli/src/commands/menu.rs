use clap::Args;
use isoboot_bootmenu::{BootEnvironment, Menu};
use isoboot_shared::ProvisionedLayout;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct MenuArgs {
    /// Image directory, usually `isos/` on a mounted data partition
    #[arg(long)]
    pub image_dir: PathBuf,

    /// Skip images without a nested configuration without pausing
    #[arg(long)]
    pub silent_skip: bool,
}

#[cfg(target_os = "linux")]
pub fn execute(args: MenuArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    use anyhow::Context;
    use isoboot::tools::PrivilegeGate;
    use isoboot_bootmenu::host::HostEnvironment;
    use isoboot_bootmenu::{BootMenuResolver, ProbeFailurePolicy};

    if !PrivilegeGate::is_root() {
        anyhow::bail!("menu preview attaches loop devices and must run as root");
    }

    let options = global.load_options()?;
    let image_dir = args
        .image_dir
        .canonicalize()
        .with_context(|| format!("{} does not exist", args.image_dir.display()))?;
    if !image_dir.is_dir() {
        anyhow::bail!("{} is not a directory", image_dir.display());
    }
    let (Some(data_root), Some(dir_name)) = (image_dir.parent(), image_dir.file_name()) else {
        anyhow::bail!("{} has no parent directory", image_dir.display());
    };

    let layout = options
        .layout()
        .with_image_dir(dir_name.to_string_lossy().into_owned());
    let policy = if args.silent_skip {
        ProbeFailurePolicy::SilentSkip
    } else {
        options.probe_failure
    };

    let mut resolver = BootMenuResolver::new(HostEnvironment::new(data_root), layout.clone())
        .with_policy(policy);
    let menu = resolver.build_menu()?;

    for (index, item) in menu.items().iter().enumerate() {
        println!("{:>3}  {}", index, item);
    }
    let skipped = skipped_images(&mut HostEnvironment::new(data_root), &layout, &menu);
    if skipped > 0 {
        eprintln!("{} image(s) skipped", skipped);
    }
    Ok(())
}

/// Images in the directory that did not make it into `menu`, whether or
/// not the operator was told about them.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn skipped_images<E: BootEnvironment>(
    env: &mut E,
    layout: &ProvisionedLayout,
    menu: &Menu,
) -> usize {
    isoboot_bootmenu::scan::scan(env, layout)
        .len()
        .saturating_sub(menu.len())
}

#[cfg(not(target_os = "linux"))]
pub fn execute(_args: MenuArgs, _global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    anyhow::bail!("menu preview is only available on Linux")
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoboot_bootmenu::{BootMenuResolver, ProbeFailurePolicy};
    use isoboot_test_utils::FakeBootEnvironment;

    const PRIMARY: &str = "/boot/grub/loopback.cfg";

    fn env() -> FakeBootEnvironment {
        FakeBootEnvironment::new()
            .with_dir("/isos", &["good.iso", "bare.iso", "notes.txt", "Other.ISO"])
            .with_image("/isos/good.iso", &[PRIMARY])
            .with_image("/isos/bare.iso", &[])
            .with_image("/isos/Other.ISO", &[])
    }

    fn skipped_with(policy: ProbeFailurePolicy) -> (usize, usize) {
        let mut env = env();
        let layout = ProvisionedLayout::default();
        let menu = BootMenuResolver::new(&mut env, layout.clone())
            .with_policy(policy)
            .build_menu()
            .unwrap();
        let skipped = skipped_images(&mut env, &layout, &menu);
        (skipped, env.acknowledgments.len())
    }

    #[test]
    fn test_skipped_images_counted_when_silent() {
        assert_eq!(skipped_with(ProbeFailurePolicy::SilentSkip), (2, 0));
    }

    #[test]
    fn test_skipped_images_counted_when_acknowledged() {
        let (skipped, _) = skipped_with(ProbeFailurePolicy::default());
        assert_eq!(skipped, 2);
    }
}
