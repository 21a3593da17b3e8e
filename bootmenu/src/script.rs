//! GRUB configuration expressing the boot menu state machine.
//!
//! This is the file installed at `/boot/grub/grub.cfg` on the ESP. It
//! performs the same scan/probe/chain-load cycle as [`crate::resolver`],
//! in GRUB's scripting language:
//! - images matched with a case-insensitive `.iso` regexp
//! - one loopback device for probing (`isoprobe`), detached per candidate
//! - one loopback device for chain-loading (`loop`), detached on return
//! - `root` saved before and restored after `configfile`

use isoboot_shared::ProvisionedLayout;
use std::fmt::Write;

/// Rendering options for the boot configuration.
#[derive(Debug, Clone)]
pub struct ScriptOptions {
    pub layout: ProvisionedLayout,
    /// Menu timeout in seconds; `None` waits forever.
    pub timeout_secs: Option<u32>,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            layout: ProvisionedLayout::default(),
            timeout_secs: Some(10),
        }
    }
}

const MODULES: &[&str] = &[
    "part_gpt", "fat", "ext2", "iso9660", "udf", "loopback", "regexp", "probe", "search",
    "configfile", "all_video", "gfxterm",
];

/// Render the boot configuration.
pub fn render(options: &ScriptOptions) -> String {
    let layout = &options.layout;
    let image_dir = layout.image_dir_path();
    let var = &layout.image_path_var;
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "# isoboot boot menu");
    let _ = writeln!(
        out,
        "# Images are the *.iso files in {} on the partition labelled '{}'.",
        image_dir, layout.data_label
    );
    let _ = writeln!(out);

    for module in MODULES {
        let _ = writeln!(out, "insmod {}", module);
    }
    let _ = writeln!(out);

    match options.timeout_secs {
        Some(secs) => {
            let _ = writeln!(out, "set timeout={}", secs);
        }
        None => {
            let _ = writeln!(out, "set timeout=-1");
        }
    }
    let _ = writeln!(out, "set default=0");
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "search --no-floppy --set=isoboot_data --label {}",
        quote(&layout.data_label)
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "if [ -n \"$isoboot_data\" -a -d \"($isoboot_data){}\" ]; then", image_dir);
    let _ = writeln!(out, "  for isofile in ($isoboot_data){}/*; do", image_dir);
    let _ = writeln!(out, "    if regexp '\\.[iI][sS][oO]$' \"$isofile\"; then");
    let _ = writeln!(out, "      regexp --set=1:isopath '^\\([^)]*\\)(.*)$' \"$isofile\"");
    let _ = writeln!(out, "      loopback isoprobe \"$isofile\"");
    let _ = writeln!(out, "      probe --set=isolabel --label (isoprobe)");
    let _ = writeln!(out, "      echo \"Probing $isopath (label: $isolabel)\"");
    let _ = writeln!(out, "      set isocfg=\"\"");
    for (i, config) in layout.nested_configs.iter().enumerate() {
        let keyword = if i == 0 { "if" } else { "elif" };
        let _ = writeln!(out, "      {} [ -f \"(isoprobe){}\" ]; then", keyword, config);
        let _ = writeln!(out, "        set isocfg=\"{}\"", config);
    }
    if !layout.nested_configs.is_empty() {
        let _ = writeln!(out, "      fi");
    }
    let _ = writeln!(out, "      loopback -d isoprobe");
    let _ = writeln!(out, "      if [ -z \"$isocfg\" ]; then");
    let _ = writeln!(out, "        echo \"No boot configuration found in $isopath\"");
    let _ = writeln!(out, "        echo \"Press Enter to skip this image.\"");
    let _ = writeln!(out, "        read");
    let _ = writeln!(out, "      else");
    let _ = writeln!(
        out,
        "        menuentry \"$isopath ($isocfg)\" \"$isofile\" \"$isopath\" \"$isocfg\" {{"
    );
    let _ = writeln!(out, "          set isoboot_saved_root=\"$root\"");
    let _ = writeln!(out, "          loopback loop \"$2\"");
    let _ = writeln!(out, "          set root=(loop)");
    let _ = writeln!(out, "          set {}=\"$3\"", var);
    let _ = writeln!(out, "          export {}", var);
    let _ = writeln!(out, "          configfile \"$4\"");
    let _ = writeln!(out, "          set root=\"$isoboot_saved_root\"");
    let _ = writeln!(out, "          loopback -d loop");
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "      fi");
    let _ = writeln!(out, "    fi");
    let _ = writeln!(out, "  done");
    let _ = writeln!(out, "fi");
    let _ = writeln!(out);

    let _ = writeln!(out, "menuentry \"Reboot\" {{");
    let _ = writeln!(out, "  reboot");
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
    let _ = writeln!(out, "menuentry \"Power off\" {{");
    let _ = writeln!(out, "  halt");
    let _ = writeln!(out, "}}");

    out
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}
