//! Relocation of failed, rolled-back attempts into the quarantine area.
//!
//! A failed move is logged and the directory stays where it is; it must never
//! mask the migration failure that triggered it.

use std::fs;
use std::path::{Path, PathBuf};

/// Move `dir` to `<quarantine_root>/<dir name>`.
///
/// Returns the new location, or `None` if the directory was left in place.
pub fn relocate(dir: &Path, quarantine_root: &Path) -> Option<PathBuf> {
    let Some(dir_name) = dir.file_name() else {
        log::warn!("Cannot quarantine {}: no directory name", dir.display());
        return None;
    };

    if let Err(e) = fs::create_dir_all(quarantine_root) {
        log::warn!(
            "Cannot create quarantine directory {}: {}; leaving {} in place",
            quarantine_root.display(),
            e,
            dir.display()
        );
        return None;
    }

    let dest = quarantine_root.join(dir_name);
    if dest.exists() {
        log::warn!(
            "Quarantine target {} already exists; leaving {} in place",
            dest.display(),
            dir.display()
        );
        return None;
    }

    match fs::rename(dir, &dest) {
        Ok(()) => {
            log::info!("Moved {} to {}", dir.display(), dest.display());
            Some(dest)
        }
        Err(e) => {
            log::warn!(
                "Failed to move {} to {}: {}; leaving it in place",
                dir.display(),
                dest.display(),
                e
            );
            None
        }
    }
}
