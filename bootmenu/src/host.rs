//! Host-side boot environment for previewing a drive's menu.
//!
//! Runs the resolver against a mounted data partition on a Linux host:
//! images are attached with `losetup` and mounted read-only so nested
//! configurations can be looked up. Requires root. Chain-loading is not
//! possible on the host and reports [`ChainOutcome::Failed`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use isoboot_shared::errors::{IsobootError, IsobootResult};
use nix::mount::{MntFlags, MsFlags, mount, umount2};
use tempfile::TempDir;

use crate::env::{BootEnvironment, ChainOutcome, LoopDevice};

const HOST_ROOT: &str = "host";

struct Mounted {
    dir: TempDir,
}

/// Boot environment backed by loop devices on the host.
pub struct HostEnvironment {
    data_root: PathBuf,
    root: String,
    exports: BTreeMap<String, String>,
    mounts: BTreeMap<String, Mounted>,
    acknowledged: Vec<String>,
}

impl HostEnvironment {
    /// `data_root` is where the data partition is mounted.
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            root: HOST_ROOT.to_string(),
            exports: BTreeMap::new(),
            mounts: BTreeMap::new(),
            acknowledged: Vec::new(),
        }
    }

    /// Messages shown through `acknowledge`, in order.
    pub fn acknowledged(&self) -> &[String] {
        &self.acknowledged
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.data_root.join(path.trim_start_matches('/'))
    }

    fn mount_point(&self, device: &LoopDevice) -> Option<&Path> {
        self.mounts.get(&device.name).map(|m| m.dir.path())
    }
}

impl BootEnvironment for HostEnvironment {
    fn list_dir(&mut self, dir: &str) -> IsobootResult<Option<Vec<String>>> {
        let path = self.resolve(dir);
        if !path.is_dir() {
            return Ok(None);
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(Some(names))
    }

    fn loopback_attach(&mut self, image: &str) -> IsobootResult<LoopDevice> {
        let file = self.resolve(image);
        let output = Command::new("losetup")
            .args(["--find", "--show", "--read-only"])
            .arg(&file)
            .output()
            .map_err(|e| IsobootError::Storage(format!("Failed to run losetup: {}", e)))?;

        if !output.status.success() {
            return Err(IsobootError::tool_failed(
                "losetup",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }

        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let device = LoopDevice::new(name, image);

        let dir = tempfile::Builder::new().prefix("isoboot-probe-").tempdir()?;
        if let Err(e) = mount(
            Some(Path::new(&device.name)),
            dir.path(),
            Some("iso9660"),
            MsFlags::MS_RDONLY,
            None::<&str>,
        ) {
            tracing::debug!(device = %device.name, error = %e, "Image is not mountable as iso9660");
        } else {
            self.mounts.insert(device.name.clone(), Mounted { dir });
        }

        Ok(device)
    }

    fn loopback_detach(&mut self, device: &LoopDevice) -> IsobootResult<()> {
        if let Some(mounted) = self.mounts.remove(&device.name) {
            umount2(mounted.dir.path(), MntFlags::MNT_DETACH).map_err(|e| {
                IsobootError::Storage(format!(
                    "Failed to unmount {}: {}",
                    mounted.dir.path().display(),
                    e
                ))
            })?;
        }

        let output = Command::new("losetup")
            .arg("-d")
            .arg(&device.name)
            .output()
            .map_err(|e| IsobootError::Storage(format!("Failed to run losetup: {}", e)))?;

        if !output.status.success() {
            return Err(IsobootError::tool_failed(
                "losetup",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }
        Ok(())
    }

    fn probe_label(&mut self, device: &LoopDevice) -> Option<String> {
        let output = Command::new("blkid")
            .args(["-s", "LABEL", "-o", "value"])
            .arg(&device.name)
            .output()
            .ok()?;
        let label = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (output.status.success() && !label.is_empty()).then_some(label)
    }

    fn file_exists(&mut self, device: &LoopDevice, path: &str) -> bool {
        self.mount_point(device)
            .map(|dir| dir.join(path.trim_start_matches('/')).is_file())
            .unwrap_or(false)
    }

    fn root(&self) -> String {
        self.root.clone()
    }

    fn set_root(&mut self, root: &str) {
        self.root = root.to_string();
    }

    fn export(&mut self, name: &str, value: &str) {
        self.exports.insert(name.to_string(), value.to_string());
    }

    fn configfile(&mut self, device: &LoopDevice, path: &str) -> ChainOutcome {
        ChainOutcome::Failed(format!(
            "cannot chain-load {} from {} on the host",
            path, device.image
        ))
    }

    fn acknowledge(&mut self, message: &str) {
        eprintln!("{}", message);
        self.acknowledged.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_dir_keeps_directory_order() {
        let data = TempDir::new().unwrap();
        let isos = data.path().join("isos");
        std::fs::create_dir(&isos).unwrap();
        for name in ["zeta.iso", "alpha.iso", "Mid.ISO", "notes.txt"] {
            std::fs::write(isos.join(name), b"").unwrap();
        }
        std::fs::create_dir(isos.join("nested.iso")).unwrap();

        let expected: Vec<String> = std::fs::read_dir(&isos)
            .unwrap()
            .map(|e| e.unwrap())
            .filter(|e| e.file_type().unwrap().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();

        let mut env = HostEnvironment::new(data.path());
        assert_eq!(env.list_dir("/isos").unwrap(), Some(expected));
    }

    #[test]
    fn test_list_dir_missing_directory() {
        let data = TempDir::new().unwrap();
        let mut env = HostEnvironment::new(data.path());
        assert_eq!(env.list_dir("/isos").unwrap(), None);
    }
}
