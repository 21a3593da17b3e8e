//! The bootloader runtime as seen by the boot menu.

use isoboot_shared::errors::IsobootResult;
use std::fmt;

/// A file attached as a loopback block device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopDevice {
    /// Device name the runtime binds `root` to (e.g. `loop`, `/dev/loop3`).
    pub name: String,
    /// Image path the device is backed by.
    pub image: String,
}

impl LoopDevice {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
        }
    }
}

impl fmt::Display for LoopDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.image)
    }
}

/// How control came back from a nested configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// The nested menu exited normally.
    Exited,
    /// The operator backed out of the nested menu.
    Aborted,
    /// The nested configuration failed to load or run.
    Failed(String),
}

/// Primitives the bootloader offers to its configuration script.
///
/// Implementations must report listings in the order the underlying
/// filesystem returns them; the resolver never re-sorts.
pub trait BootEnvironment {
    /// Non-recursive listing of `dir` on the data partition.
    ///
    /// Returns `Ok(None)` if the directory does not exist.
    fn list_dir(&mut self, dir: &str) -> IsobootResult<Option<Vec<String>>>;

    /// Attach an image file as a loopback device.
    fn loopback_attach(&mut self, image: &str) -> IsobootResult<LoopDevice>;

    /// Detach a previously attached loopback device.
    fn loopback_detach(&mut self, device: &LoopDevice) -> IsobootResult<()>;

    /// Filesystem label of the attached image, if any.
    fn probe_label(&mut self, device: &LoopDevice) -> Option<String>;

    /// Whether `path` exists inside the attached image.
    fn file_exists(&mut self, device: &LoopDevice, path: &str) -> bool;

    /// Current active root device binding.
    fn root(&self) -> String;

    fn set_root(&mut self, root: &str);

    /// Export a variable into nested configurations.
    fn export(&mut self, name: &str, value: &str);

    /// Transfer control into a nested configuration until it returns.
    fn configfile(&mut self, device: &LoopDevice, path: &str) -> ChainOutcome;

    /// Show a message and block until the operator acknowledges it.
    fn acknowledge(&mut self, message: &str);
}

impl<E: BootEnvironment + ?Sized> BootEnvironment for &mut E {
    fn list_dir(&mut self, dir: &str) -> IsobootResult<Option<Vec<String>>> {
        (**self).list_dir(dir)
    }

    fn loopback_attach(&mut self, image: &str) -> IsobootResult<LoopDevice> {
        (**self).loopback_attach(image)
    }

    fn loopback_detach(&mut self, device: &LoopDevice) -> IsobootResult<()> {
        (**self).loopback_detach(device)
    }

    fn probe_label(&mut self, device: &LoopDevice) -> Option<String> {
        (**self).probe_label(device)
    }

    fn file_exists(&mut self, device: &LoopDevice, path: &str) -> bool {
        (**self).file_exists(device, path)
    }

    fn root(&self) -> String {
        (**self).root()
    }

    fn set_root(&mut self, root: &str) {
        (**self).set_root(root)
    }

    fn export(&mut self, name: &str, value: &str) {
        (**self).export(name, value)
    }

    fn configfile(&mut self, device: &LoopDevice, path: &str) -> ChainOutcome {
        (**self).configfile(device, path)
    }

    fn acknowledge(&mut self, message: &str) {
        (**self).acknowledge(message)
    }
}
