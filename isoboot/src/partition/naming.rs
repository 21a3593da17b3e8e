use std::path::{Path, PathBuf};

/// Path of partition `number` on `disk`.
///
/// Follows the kernel rule: disks whose name ends in a digit
/// (`nvme0n1`, `mmcblk0`, `loop0`) get a `p` separator.
pub fn partition_device_path(disk: &Path, number: u8) -> PathBuf {
    let name = disk.as_os_str().to_string_lossy();
    let separator = if name.ends_with(|c: char| c.is_ascii_digit()) {
        "p"
    } else {
        ""
    };
    PathBuf::from(format!("{}{}{}", name, separator, number))
}
