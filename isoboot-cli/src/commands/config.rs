pub fn execute(global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let options = global.load_options()?;
    if let Some(path) = isoboot::IsobootOptions::config_path(global.config.as_deref()) {
        let origin = if path.exists() { "loaded" } else { "not found, using defaults" };
        eprintln!("# {} ({})", path.display(), origin);
    }
    print!("{}", options.to_yaml()?);
    Ok(())
}
