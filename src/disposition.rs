// SPDX-License-Identifier: MIT

//! Post-scan file disposition
//!
//! Copies or moves matched images into a destination directory. A file that
//! vanished or cannot be written is logged and skipped; the rest of the
//! batch still goes through. Same-named files already at the destination
//! are overwritten.

use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::classifier::basename;
use crate::config::DispositionMode;
use crate::sink::ScanSink;

/// Copy or move `matched` into `destination`, creating it if needed
///
/// No-op for an empty match set. Emits a completion log line even when some
/// files were skipped.
pub fn relocate(
    matched: &[PathBuf],
    destination: &Path,
    mode: DispositionMode,
    sink: &dyn ScanSink,
) {
    if matched.is_empty() {
        return;
    }

    if let Err(e) = fs::create_dir_all(destination) {
        warn!("Cannot create destination {}: {}", destination.display(), e);
        sink.log(&format!(
            "Error creating destination folder {}: {}",
            destination.display(),
            e
        ));
        return;
    }

    let verb = match mode {
        DispositionMode::Copy => "Copying",
        DispositionMode::Move => "Moving",
    };
    sink.log(&format!(
        "{} {} images to folder: {} ...",
        verb,
        matched.len(),
        destination.display()
    ));

    for path in matched {
        let target = destination.join(basename(path));
        let result = match mode {
            DispositionMode::Copy => copy_file(path, &target),
            DispositionMode::Move => move_file(path, &target),
        };
        if let Err(e) = result {
            warn!("Skipping {}: {}", path.display(), e);
            sink.log(&format!(
                "Error {} file {}: {}",
                verb.to_lowercase(),
                basename(path),
                e
            ));
        }
    }

    let action = match mode {
        DispositionMode::Copy => "copy",
        DispositionMode::Move => "move",
    };
    sink.log(&format!("File {} process is complete.", action));
}

/// Copy a file and carry the source's modification time over
fn copy_file(from: &Path, to: &Path) -> std::io::Result<()> {
    let metadata = fs::metadata(from)?;
    fs::copy(from, to)?;
    let mtime = FileTime::from_last_modification_time(&metadata);
    filetime::set_file_mtime(to, mtime)
}

/// Rename where possible, copy-and-delete across filesystems
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            copy_file(from, to)?;
            fs::remove_file(from)
        }
    }
}
