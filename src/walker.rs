// SPDX-License-Identifier: MIT

//! Image enumeration
//!
//! Walks the configured root and collects candidate image paths by
//! extension. An unreadable subtree is skipped with a warning, never fatal;
//! a missing root is reported before any scan state exists.

use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::{Result, ScanError};

/// Extensions the scanner considers images (compared case-insensitively)
pub const SUPPORTED_EXTENSIONS: &[&str] =
    &["png", "jpg", "jpeg", "webp", "cr2", "dng", "tiff"];

/// Check whether a path carries a supported image extension
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Enumerate candidate images under `root`
///
/// With `recursive` set, descends every subdirectory; otherwise only direct
/// children that are regular files are considered. Returns an empty list for
/// a directory with no matching files.
pub fn enumerate(root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(ScanError::Validation(format!(
            "image directory not found: {}",
            root.display()
        )));
    }

    let walker = if recursive {
        WalkDir::new(root)
    } else {
        WalkDir::new(root).max_depth(1)
    };
    let mut images = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Unreadable subtree: skip it, keep walking
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.file_type().is_file() && is_supported(entry.path()) {
            images.push(entry.into_path());
        }
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.jpg"));
        touch(&dir.path().join("b.PNG"));
        touch(&dir.path().join("c.txt"));
        touch(&dir.path().join("noext"));

        let mut found = enumerate(dir.path(), false).unwrap();
        found.sort();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG"]);
    }

    #[test]
    fn non_recursive_skips_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("top.jpg"));
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        touch(&sub.join("nested.jpg"));

        let found = enumerate(dir.path(), false).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("top.jpg"));
    }

    #[test]
    fn recursive_descends() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("top.jpg"));
        let sub = dir.path().join("sub").join("deeper");
        fs::create_dir_all(&sub).unwrap();
        touch(&sub.join("nested.cr2"));

        let found = enumerate(dir.path(), true).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    #[cfg(unix)]
    fn unreadable_subdirectory_is_skipped_not_fatal() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("top.jpg"));
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        touch(&locked.join("hidden.jpg"));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // Under root the chmod does not block reads; note which case we got
        let blocked = fs::read_dir(&locked).is_err();

        let result = enumerate(dir.path(), true);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        let found = result.unwrap();
        assert!(found.iter().any(|p| p.ends_with("top.jpg")));
        if blocked {
            assert_eq!(found.len(), 1);
        }
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(enumerate(dir.path(), true).unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_an_error() {
        let result = enumerate(Path::new("/nonexistent/imagehound-test"), true);
        assert!(matches!(result, Err(ScanError::Validation(_))));
    }
}
