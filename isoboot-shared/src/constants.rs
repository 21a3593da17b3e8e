//! Shared constants between provisioning and boot time.
//!
//! These values form the on-device contract: the provisioner writes them
//! and the boot menu reads them, so both sides must agree exactly.

/// Partition geometry (MiB).
pub mod geometry {
    /// The first MiB stays unallocated (GPT header + alignment).
    pub const LEADING_GAP_MIB: u64 = 1;

    /// Reserved at the end of the disk for the backup GPT.
    pub const TRAILING_RESERVE_MIB: u64 = 1;

    /// BIOS-boot partition size (GRUB core.img for legacy firmware).
    pub const BIOS_BOOT_MIB: u64 = 1;

    /// EFI system partition size.
    pub const ESP_MIB: u64 = 50;

    /// Smallest data partition worth creating.
    pub const MIN_DATA_MIB: u64 = 256;

    pub const MIB: u64 = 1024 * 1024;
}

/// Partition names and filesystem labels.
pub mod labels {
    pub const BIOS_BOOT_NAME: &str = "BIOS";

    pub const ESP_NAME: &str = "EFI";

    pub const DATA_NAME: &str = "ISOS";

    /// FAT volume label of the ESP (max 11 chars, upper case).
    pub const ESP_LABEL: &str = "ISOBOOT_EFI";

    /// ext2 label of the data partition, searched for at boot.
    pub const DATA_LABEL: &str = "isoboot_data";
}

/// Paths and names read by the boot menu.
pub mod boot {
    /// Bootloader configuration inside the ESP.
    pub const CONFIG_PATH: &str = "/boot/grub/grub.cfg";

    /// Boot directory inside the ESP (grub-install --boot-directory).
    pub const BOOT_DIR: &str = "boot";

    /// Top-level image directory on the data partition.
    pub const IMAGE_DIR: &str = "isos";

    /// Image file suffix, matched case-insensitively.
    pub const IMAGE_SUFFIX: &str = ".iso";

    /// Nested configuration probed first.
    pub const NESTED_CONFIG_PRIMARY: &str = "/boot/grub/loopback.cfg";

    /// Nested configuration probed when the primary is absent.
    pub const NESTED_CONFIG_ALTERNATE: &str = "/boot/grub/grub.cfg";

    /// Variable exported to the nested configuration.
    pub const IMAGE_PATH_VAR: &str = "iso_path";
}

/// GRUB installer targets.
pub mod grub {
    pub const BIOS_TARGET: &str = "i386-pc";

    pub const UEFI_TARGET: &str = "x86_64-efi";
}

pub mod envs {
    pub const ISOBOOT_CONFIG: &str = "ISOBOOT_CONFIG";
}
