pub mod config;
pub mod grub_config;
pub mod list;
pub mod menu;
pub mod plan;
pub mod provision;

use clap::ValueEnum;

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}
