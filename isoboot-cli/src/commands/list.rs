use clap::Args;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use isoboot::device::{Enumerator, LsblkEnumerator};
use isoboot::tools::SystemRunner;
use isoboot::util::human_size;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Include fixed disks and partitions
    #[arg(short, long)]
    pub all: bool,
}

pub fn execute(args: ListArgs, _global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let runner = SystemRunner;
    let snapshot = LsblkEnumerator::new(&runner).snapshot()?;

    let devices: Vec<_> = if args.all {
        snapshot.devices().collect()
    } else {
        snapshot.candidates().collect()
    };

    if devices.is_empty() {
        eprintln!("No removable disks found");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["DEVICE", "SIZE", "TYPE", "REMOVABLE", "MODEL"]);
    for device in devices {
        table.add_row(vec![
            Cell::new(device.path.display()),
            Cell::new(human_size(device.size)),
            Cell::new(format!("{:?}", device.kind).to_lowercase()),
            Cell::new(if device.hotplug { "yes" } else { "no" }),
            Cell::new(device.description()),
        ]);
    }
    println!("{table}");
    Ok(())
}
