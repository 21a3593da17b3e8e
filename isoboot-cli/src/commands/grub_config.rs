use anyhow::Context;
use clap::Args;
use isoboot::provision::stages::config::boot_config_text;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct GrubConfigArgs {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn execute(args: GrubConfigArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let options = global.load_options()?;
    let text = boot_config_text(&options)?;

    match args.output {
        Some(path) => std::fs::write(&path, text)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{}", text),
    }
    Ok(())
}
