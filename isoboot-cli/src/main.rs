//! isoboot command-line interface.

mod cli;
mod commands;
mod terminal;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn init_logging(debug: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_level = if debug { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let logs_dir = dirs::state_dir()
        .or_else(dirs::cache_dir)
        .map(|dir| dir.join("isoboot").join("logs"));
    let Some(logs_dir) = logs_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok()) else {
        // No writable state directory: stderr only.
        let _ = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .with_target(false)
            .try_init();
        return None;
    };

    let file_appender = tracing_appender::rolling::daily(logs_dir, "isoboot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    isoboot::util::register_to_tracing(non_blocking, env_filter);
    Some(guard)
}

fn main() {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.global.debug);

    let result = match cli.command {
        Commands::List(args) => commands::list::execute(args, &cli.global),
        Commands::Plan(args) => commands::plan::execute(args, &cli.global),
        Commands::Provision(args) => commands::provision::execute(args, &cli.global),
        Commands::GrubConfig(args) => commands::grub_config::execute(args, &cli.global),
        Commands::Menu(args) => commands::menu::execute(args, &cli.global),
        Commands::Config => commands::config::execute(&cli.global),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
