//! Scanning the image directory.

use isoboot_shared::ProvisionedLayout;
use isoboot_shared::constants::boot::IMAGE_SUFFIX;

use crate::env::BootEnvironment;

/// An image file found in the image directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    /// File name within the image directory.
    pub name: String,
    /// Path from the data partition root, e.g. `/isos/debian.iso`.
    pub path: String,
}

/// Case-insensitive `.iso` suffix match.
pub fn is_image_name(name: &str) -> bool {
    let suffix_len = IMAGE_SUFFIX.len();
    name.len() > suffix_len
        && name
            .get(name.len() - suffix_len..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(IMAGE_SUFFIX))
}

/// List image candidates in listing order.
///
/// A missing or unreadable directory yields no candidates; the menu still
/// gets its terminal entries.
pub fn scan<E: BootEnvironment>(env: &mut E, layout: &ProvisionedLayout) -> Vec<ImageCandidate> {
    let dir = layout.image_dir_path();

    let names = match env.list_dir(&dir) {
        Ok(Some(names)) => names,
        Ok(None) => {
            tracing::warn!(dir = %dir, "Image directory not found");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!(dir = %dir, error = %e, "Failed to list image directory");
            return Vec::new();
        }
    };

    let mut candidates = Vec::new();
    for name in names {
        if !is_image_name(&name) {
            tracing::trace!(name = %name, "Skipping non-image entry");
            continue;
        }
        candidates.push(ImageCandidate {
            path: format!("{}/{}", dir, name),
            name,
        });
    }

    tracing::debug!(count = candidates.len(), dir = %dir, "Scanned image directory");
    candidates
}
