#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Isolated config and state directories for one invocation.
pub struct TestContext {
    pub home: TempDir,
}

impl TestContext {
    pub fn new_cmd(&self) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_isoboot");
        let mut cmd = Command::new(bin_path);
        cmd.timeout(Duration::from_secs(30));
        cmd.env_remove("ISOBOOT_CONFIG");
        cmd.env_remove("RUST_LOG");
        cmd.env("HOME", self.home.path());
        cmd.env("XDG_CONFIG_HOME", self.home.path().join("config"));
        cmd.env("XDG_STATE_HOME", self.home.path().join("state"));
        cmd.env("XDG_CACHE_HOME", self.home.path().join("cache"));
        cmd
    }

    /// Write `contents` as a config file and return its path.
    pub fn write_config(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.home.path().join(name);
        std::fs::write(&path, contents).expect("Failed to write test config");
        path
    }

    pub fn path(&self) -> &Path {
        self.home.path()
    }
}

pub fn isoboot() -> TestContext {
    let home = tempfile::Builder::new()
        .prefix("isoboot-cli-")
        .tempdir()
        .expect("Failed to create test home");
    TestContext { home }
}
