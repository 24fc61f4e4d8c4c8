//! Recursive traversal of the watch root
//!
//! Collects the modification time of every regular file below the root.
//! Entries that fail to list or stat (typically deleted mid-walk) are treated
//! as absent. Symlinks to files are followed; symlinked directories are not
//! descended.

use std::collections::BTreeMap;
use std::fs::{self, ReadDir};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// Modification time per file path, sorted by path
pub type FileTimes = BTreeMap<PathBuf, SystemTime>;

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("Failed to read watch root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Walk `root` and return the modification time of every regular file in it
pub fn walk_tree(root: &Path) -> Result<FileTimes, WalkError> {
    let entries = fs::read_dir(root).map_err(|source| WalkError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    let mut files = FileTimes::new();
    collect_entries(entries, &mut files);
    Ok(files)
}

/// Modification time of a single file, `None` if it is not a readable regular file
pub fn modification_time(path: &Path) -> Option<SystemTime> {
    let metadata = fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }
    metadata.modified().ok()
}

fn walk_dir(dir: &Path, files: &mut FileTimes) {
    match fs::read_dir(dir) {
        Ok(entries) => collect_entries(entries, files),
        Err(err) => log::debug!("Skipping unreadable directory {}: {}", dir.display(), err),
    }
}

fn collect_entries(entries: ReadDir, files: &mut FileTimes) {
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::debug!("Skipping unreadable entry: {}", err);
                continue;
            }
        };

        let path = entry.path();
        let is_dir = match entry.file_type() {
            Ok(file_type) => file_type.is_dir(),
            Err(err) => {
                log::debug!("Skipping {}: {}", path.display(), err);
                continue;
            }
        };

        if is_dir {
            walk_dir(&path, files);
        } else if let Some(mtime) = modification_time(&path) {
            files.insert(path, mtime);
        }
    }
}
