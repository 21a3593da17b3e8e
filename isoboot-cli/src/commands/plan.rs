use anyhow::Context;
use clap::Args;
use isoboot::device::{Enumerator, LsblkEnumerator};
use isoboot::partition::{parse_size_mib, usable_mib};
use isoboot::tools::SystemRunner;
use isoboot::util::human_size;
use isoboot_shared::constants::geometry::MIB;
use std::path::PathBuf;

use super::OutputFormat;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Plan for this block device
    #[arg(long, conflicts_with = "capacity", required_unless_present = "capacity")]
    pub device: Option<PathBuf>,

    /// Plan for a device of this capacity (e.g. 16GiB)
    #[arg(long)]
    pub capacity: Option<String>,

    /// Data partition size (e.g. 8G); defaults to the largest that fits
    #[arg(long)]
    pub size: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn execute(args: PlanArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let options = global.load_options()?;
    let planner = options.planner();

    let capacity_bytes = match (&args.device, &args.capacity) {
        (Some(path), _) => {
            let runner = SystemRunner;
            let snapshot = LsblkEnumerator::new(&runner).snapshot()?;
            let device = snapshot
                .get(path)
                .with_context(|| format!("{} is not a block device", path.display()))?;
            device.size
        }
        (None, Some(capacity)) => {
            let mib = parse_size_mib(capacity)
                .with_context(|| format!("invalid capacity '{}'", capacity))?;
            mib.checked_mul(MIB)
                .with_context(|| format!("capacity '{}' is too large", capacity))?
        }
        (None, None) => anyhow::bail!("either --device or --capacity is required"),
    };

    let plan = match &args.size {
        Some(size) => {
            let data_mib =
                parse_size_mib(size).with_context(|| format!("invalid size '{}'", size))?;
            planner.plan(capacity_bytes, data_mib)?
        }
        None => planner.plan_filling(capacity_bytes)?,
    };

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            return Ok(());
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(&plan)?);
            return Ok(());
        }
        OutputFormat::Text => {}
    }

    let range = planner.data_size_range(capacity_bytes)?;
    println!(
        "Capacity: {} ({} MiB usable)",
        human_size(capacity_bytes),
        usable_mib(capacity_bytes)
    );
    println!(
        "Data partition: {} MiB (allowed {} - {} MiB)",
        plan.data().size_mib(),
        range.start(),
        range.end()
    );
    print!("{}", plan);
    Ok(())
}
