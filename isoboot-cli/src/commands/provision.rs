use anyhow::Context;
use clap::Args;
use isoboot::device::LsblkEnumerator;
use isoboot::partition::parse_size_mib;
use isoboot::provision::{DeviceSource, SessionRequest, run_session};
use isoboot::tools::{PrivilegeGate, SystemRunner};
use std::path::PathBuf;

use super::OutputFormat;
use crate::terminal::TerminalOperator;

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Data partition size (e.g. 8G); asked interactively when omitted
    #[arg(long)]
    pub size: Option<String>,

    /// Answer yes to every confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Use this disk instead of detecting a newly attached one
    #[arg(long)]
    pub device: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn execute(args: ProvisionArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let options = global.load_options()?;

    let data_size_mib = args
        .size
        .as_deref()
        .map(|size| parse_size_mib(size).with_context(|| format!("invalid size '{}'", size)))
        .transpose()?;

    let source = match args.device {
        Some(path) => DeviceSource::Path(path),
        None => DeviceSource::Detect,
    };

    let work_dir = tempfile::Builder::new()
        .prefix("isoboot-")
        .tempdir()
        .context("Failed to create work directory")?;

    let runner = SystemRunner;
    let enumerator = LsblkEnumerator::new(&runner);
    let mut operator = TerminalOperator::new(args.yes);

    let report = run_session(
        runner,
        &enumerator,
        &mut operator,
        &options,
        SessionRequest {
            source,
            data_size_mib,
            work_dir: work_dir.path(),
            running_as_root: PrivilegeGate::is_root(),
        },
    )?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Text => {
            for stage in &report.stages {
                println!("{:<16} {:>8} ms", stage.stage.as_str(), stage.duration_ms);
            }
            println!(
                "{} is ready; copy images into {}/ on the {} partition",
                report.device.path.display(),
                options.image_dir,
                options.data_label
            );
        }
    }
    Ok(())
}
