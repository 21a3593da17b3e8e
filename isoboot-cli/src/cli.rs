use clap::{Args, Parser, Subcommand};
use isoboot::IsobootOptions;
use isoboot_shared::constants::envs;
use std::path::PathBuf;

use crate::commands;

#[derive(Parser, Debug)]
#[command(
    name = "isoboot",
    author,
    version,
    about = "Provision removable drives that boot many ISO images on BIOS and UEFI"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags accepted by every command.
#[derive(Args, Debug)]
pub struct GlobalFlags {
    /// Configuration file (YAML)
    #[arg(long, global = true, env = envs::ISOBOOT_CONFIG)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, global = true)]
    pub debug: bool,
}

impl GlobalFlags {
    pub fn load_options(&self) -> anyhow::Result<IsobootOptions> {
        Ok(IsobootOptions::discover(self.config.as_deref())?)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List removable disks
    List(commands::list::ListArgs),

    /// Show the partition plan for a device or capacity
    Plan(commands::plan::PlanArgs),

    /// Wipe a removable disk and make it boot ISO images
    Provision(commands::provision::ProvisionArgs),

    /// Print the boot configuration installed on the drive
    GrubConfig(commands::grub_config::GrubConfigArgs),

    /// Preview the boot menu for a directory of images (requires root)
    Menu(commands::menu::MenuArgs),

    /// Print the effective configuration
    Config,
}
