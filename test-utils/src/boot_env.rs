use isoboot_bootmenu::{BootEnvironment, ChainOutcome, LoopDevice, Menu, MenuSelector, Selection};
use isoboot_shared::errors::{IsobootError, IsobootResult};
use std::collections::{HashMap, VecDeque};

/// Behaviour of one image file.
#[derive(Debug, Clone)]
pub struct FakeImage {
    /// Files present inside the image.
    pub files: Vec<String>,
    pub label: Option<String>,
    pub outcome: ChainOutcome,
    pub attach_fails: bool,
}

impl Default for FakeImage {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            label: None,
            outcome: ChainOutcome::Exited,
            attach_fails: false,
        }
    }
}

/// One `configfile` call as observed by the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainCall {
    pub image: String,
    pub config: String,
    pub root: String,
    pub exports: Vec<(String, String)>,
    pub attached: usize,
}

/// In-memory bootloader runtime.
#[derive(Debug)]
pub struct FakeBootEnvironment {
    dirs: HashMap<String, Vec<String>>,
    images: HashMap<String, FakeImage>,
    attached: Vec<LoopDevice>,
    attaches_per_image: HashMap<String, usize>,
    next_loop: usize,
    root: String,
    exports: Vec<(String, String)>,

    pub max_attached: usize,
    pub attach_count: usize,
    pub detach_count: usize,
    pub root_history: Vec<String>,
    pub acknowledgments: Vec<String>,
    pub chain_calls: Vec<ChainCall>,
}

impl Default for FakeBootEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBootEnvironment {
    pub const INITIAL_ROOT: &'static str = "hd0,gpt3";

    pub fn new() -> Self {
        Self {
            dirs: HashMap::new(),
            images: HashMap::new(),
            attached: Vec::new(),
            attaches_per_image: HashMap::new(),
            next_loop: 0,
            root: Self::INITIAL_ROOT.to_string(),
            exports: Vec::new(),
            max_attached: 0,
            attach_count: 0,
            detach_count: 0,
            root_history: Vec::new(),
            acknowledgments: Vec::new(),
            chain_calls: Vec::new(),
        }
    }

    /// Directory listing, in the given order.
    pub fn with_dir(mut self, dir: &str, names: &[&str]) -> Self {
        self.dirs
            .insert(dir.to_string(), names.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Image at `path` containing `files`.
    pub fn with_image(mut self, path: &str, files: &[&str]) -> Self {
        self.images.insert(
            path.to_string(),
            FakeImage {
                files: files.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
        );
        self
    }

    pub fn with_label(mut self, path: &str, label: &str) -> Self {
        self.images.entry(path.to_string()).or_default().label = Some(label.to_string());
        self
    }

    pub fn with_outcome(mut self, path: &str, outcome: ChainOutcome) -> Self {
        self.images.entry(path.to_string()).or_default().outcome = outcome;
        self
    }

    /// Make the first attach of `path` succeed and later ones fail.
    pub fn with_failing_attach(mut self, path: &str) -> Self {
        self.images.entry(path.to_string()).or_default().attach_fails = true;
        self
    }

    pub fn root_now(&self) -> &str {
        &self.root
    }

    pub fn attached(&self) -> &[LoopDevice] {
        &self.attached
    }

    pub fn exports(&self) -> &[(String, String)] {
        &self.exports
    }
}

impl BootEnvironment for FakeBootEnvironment {
    fn list_dir(&mut self, dir: &str) -> IsobootResult<Option<Vec<String>>> {
        Ok(self.dirs.get(dir).cloned())
    }

    fn loopback_attach(&mut self, image: &str) -> IsobootResult<LoopDevice> {
        let Some(fake) = self.images.get(image) else {
            return Err(IsobootError::Probe(format!("{} not found", image)));
        };
        let previous = self.attaches_per_image.get(image).copied().unwrap_or(0);
        if fake.attach_fails && previous > 0 {
            return Err(IsobootError::Probe(format!("{} is unreadable", image)));
        }

        *self.attaches_per_image.entry(image.to_string()).or_default() += 1;
        self.attach_count += 1;
        let device = LoopDevice::new(format!("loop{}", self.next_loop), image);
        self.next_loop += 1;
        self.attached.push(device.clone());
        self.max_attached = self.max_attached.max(self.attached.len());
        Ok(device)
    }

    fn loopback_detach(&mut self, device: &LoopDevice) -> IsobootResult<()> {
        let before = self.attached.len();
        self.attached.retain(|d| d != device);
        if self.attached.len() == before {
            return Err(IsobootError::Probe(format!("{} is not attached", device)));
        }
        self.detach_count += 1;
        Ok(())
    }

    fn probe_label(&mut self, device: &LoopDevice) -> Option<String> {
        self.images.get(&device.image).and_then(|i| i.label.clone())
    }

    fn file_exists(&mut self, device: &LoopDevice, path: &str) -> bool {
        self.images
            .get(&device.image)
            .is_some_and(|i| i.files.iter().any(|f| f == path))
    }

    fn root(&self) -> String {
        self.root.clone()
    }

    fn set_root(&mut self, root: &str) {
        self.root = root.to_string();
        self.root_history.push(root.to_string());
    }

    fn export(&mut self, name: &str, value: &str) {
        self.exports.push((name.to_string(), value.to_string()));
    }

    fn configfile(&mut self, device: &LoopDevice, path: &str) -> ChainOutcome {
        self.chain_calls.push(ChainCall {
            image: device.image.clone(),
            config: path.to_string(),
            root: self.root.clone(),
            exports: self.exports.clone(),
            attached: self.attached.len(),
        });
        self.images
            .get(&device.image)
            .map(|i| i.outcome.clone())
            .unwrap_or_else(|| ChainOutcome::Failed("image vanished".to_string()))
    }

    fn acknowledge(&mut self, message: &str) {
        self.acknowledgments.push(message.to_string());
    }
}

/// Replays a fixed list of selections.
#[derive(Debug, Default)]
pub struct FixedSelector {
    selections: VecDeque<Selection>,
    pub menus_seen: usize,
}

impl FixedSelector {
    pub fn new(selections: impl IntoIterator<Item = Selection>) -> Self {
        Self {
            selections: selections.into_iter().collect(),
            menus_seen: 0,
        }
    }
}

impl MenuSelector for FixedSelector {
    fn select(&mut self, _menu: &Menu) -> Selection {
        self.menus_seen += 1;
        self.selections.pop_front().unwrap_or(Selection::Halt)
    }
}
