//! Last observed state of the watch root
//!
//! Maps absolute file paths to the modification time seen on the last scan.
//! A path is new when it is not tracked, modified when its current time is
//! strictly later than the tracked one, and deleted when a scan no longer
//! finds it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::walk::FileTimes;

/// Classification of a walked path against the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    New,
    Modified,
    Unchanged,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: HashMap<PathBuf, SystemTime>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Baseline built from a full walk
    pub fn from_walk(files: &FileTimes) -> Self {
        Self {
            entries: files.iter().map(|(path, mtime)| (path.clone(), *mtime)).collect(),
        }
    }

    pub fn get(&self, path: &Path) -> Option<SystemTime> {
        self.entries.get(path).copied()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compare an observed modification time with the tracked one
    pub fn classify(&self, path: &Path, mtime: SystemTime) -> Change {
        match self.entries.get(path) {
            None => Change::New,
            Some(seen) if mtime > *seen => Change::Modified,
            Some(_) => Change::Unchanged,
        }
    }

    /// Track `path` at `mtime`, replacing any previous entry
    pub fn record(&mut self, path: PathBuf, mtime: SystemTime) {
        self.entries.insert(path, mtime);
    }

    pub fn remove(&mut self, path: &Path) -> Option<SystemTime> {
        self.entries.remove(path)
    }

    /// Tracked paths missing from `current`, sorted
    pub fn vanished(&self, current: &FileTimes) -> Vec<PathBuf> {
        let mut gone: Vec<PathBuf> = self
            .entries
            .keys()
            .filter(|path| !current.contains_key(*path))
            .cloned()
            .collect();
        gone.sort();
        gone
    }
}
