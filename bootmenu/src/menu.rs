//! Boot menu built from one scan.

use std::fmt;

/// Menu entry for an attachable image. Lives for a single boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub title: String,
    /// Image path from the data partition root.
    pub image: String,
    /// Nested configuration found when probing.
    pub config: String,
}

impl MenuEntry {
    pub fn new(image: impl Into<String>, config: impl Into<String>) -> Self {
        let image = image.into();
        let config = config.into();
        Self {
            title: format!("{} ({})", image, config),
            image,
            config,
        }
    }
}

/// Anything the operator can pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItem {
    Image(MenuEntry),
    Halt,
    Reboot,
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuItem::Image(entry) => f.write_str(&entry.title),
            MenuItem::Halt => f.write_str("Power off"),
            MenuItem::Reboot => f.write_str("Reboot"),
        }
    }
}

/// Image entries in scan order, followed by the terminal entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Menu {
    entries: Vec<MenuEntry>,
}

impl Menu {
    pub fn new(entries: Vec<MenuEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&MenuEntry> {
        self.entries.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn items(&self) -> Vec<MenuItem> {
        self.entries
            .iter()
            .cloned()
            .map(MenuItem::Image)
            .chain([MenuItem::Halt, MenuItem::Reboot])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_title() {
        let entry = MenuEntry::new("/isos/x.iso", "/boot/grub/loopback.cfg");
        assert_eq!(entry.title, "/isos/x.iso (/boot/grub/loopback.cfg)");
    }

    #[test]
    fn test_empty_menu_still_has_terminal_items() {
        let menu = Menu::default();
        assert!(menu.is_empty());
        assert_eq!(menu.items(), vec![MenuItem::Halt, MenuItem::Reboot]);
    }
}
