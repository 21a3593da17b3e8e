//! Test doubles shared by the isoboot integration tests.
//!
//! - [`RecordingRunner`]: records every tool invocation, with canned output
//!   and scripted failures
//! - [`ScriptedOperator`]: answers checkpoints from a queue
//! - [`FakeBootEnvironment`]: in-memory bootloader runtime

mod boot_env;
mod operator;
mod runner;

pub use boot_env::{ChainCall, FakeBootEnvironment, FakeImage, FixedSelector};
pub use operator::ScriptedOperator;
pub use runner::RecordingRunner;

use isoboot::device::{BlockDevice, DeviceKind};

pub const GIB: u64 = 1024 * 1024 * 1024;

/// A hotplug whole disk of `size_gib`.
pub fn usb_disk(path: &str, size_gib: u64) -> BlockDevice {
    BlockDevice::new(path, size_gib * GIB, true, DeviceKind::Disk)
}

/// Scratch directory for mount points and staged files.
pub fn work_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("isoboot-test-")
        .tempdir()
        .expect("create work dir")
}
