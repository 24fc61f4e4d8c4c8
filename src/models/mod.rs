//! Data models module
//!
//! Defines core data structures:
//! - WatchConfiguration: resolved runtime settings for the scan loop
//! - WatchEvent: everything the daemon reports to the operator
//! - TickReport: the events produced by one scan of the watch root

use serde::{Deserialize, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Output rendering for operator events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Fully resolved configuration for a watch session
#[derive(Debug, Clone, PartialEq)]
pub struct WatchConfiguration {
    /// Canonical directory that is scanned recursively
    pub root: PathBuf,
    /// Absolute path of the rules file
    pub config_path: PathBuf,
    /// Delay between two scans
    pub interval: Duration,
    /// How events are rendered on stdout
    pub output: OutputFormat,
    /// Suppress per-file "applied" lines
    pub quiet: bool,
}

/// Operator-visible event emitted by the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum WatchEvent {
    WatchStarted {
        #[serde(serialize_with = "lossy_path")]
        root: PathBuf,
        #[serde(serialize_with = "lossy_path")]
        config_path: PathBuf,
        interval_ms: u64,
    },
    RulesLoaded {
        #[serde(serialize_with = "lossy_path")]
        path: PathBuf,
        count: usize,
    },
    RulesReloadFailed {
        #[serde(serialize_with = "lossy_path")]
        path: PathBuf,
        error: String,
    },
    NewFile {
        #[serde(serialize_with = "lossy_path")]
        path: PathBuf,
    },
    FileModified {
        #[serde(serialize_with = "lossy_path")]
        path: PathBuf,
    },
    FileDeleted {
        #[serde(serialize_with = "lossy_path")]
        path: PathBuf,
    },
    PermissionsApplied {
        #[serde(serialize_with = "lossy_path")]
        path: PathBuf,
        perm_spec: String,
        mode: String,
    },
    PermissionsFailed {
        #[serde(serialize_with = "lossy_path")]
        path: PathBuf,
        perm_spec: String,
        error: String,
    },
    ScanFailed {
        #[serde(serialize_with = "lossy_path")]
        root: PathBuf,
        error: String,
    },
    WatchStopped,
}

impl WatchEvent {
    /// Path the event is about, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            WatchEvent::RulesLoaded { path, .. }
            | WatchEvent::RulesReloadFailed { path, .. }
            | WatchEvent::NewFile { path }
            | WatchEvent::FileModified { path }
            | WatchEvent::FileDeleted { path }
            | WatchEvent::PermissionsApplied { path, .. }
            | WatchEvent::PermissionsFailed { path, .. } => Some(path.as_path()),
            WatchEvent::WatchStarted { root, .. } | WatchEvent::ScanFailed { root, .. } => {
                Some(root.as_path())
            }
            WatchEvent::WatchStopped => None,
        }
    }

    /// Whether the event reports a failure
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            WatchEvent::RulesReloadFailed { .. }
                | WatchEvent::PermissionsFailed { .. }
                | WatchEvent::ScanFailed { .. }
        )
    }
}

/// Events produced by a single tick, in the order they happened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub events: Vec<WatchEvent>,
}

impl TickReport {
    pub fn push(&mut self, event: WatchEvent) {
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn new_files(&self) -> Vec<&Path> {
        self.paths_where(|event| matches!(event, WatchEvent::NewFile { .. }))
    }

    pub fn modified_files(&self) -> Vec<&Path> {
        self.paths_where(|event| matches!(event, WatchEvent::FileModified { .. }))
    }

    pub fn deleted_files(&self) -> Vec<&Path> {
        self.paths_where(|event| matches!(event, WatchEvent::FileDeleted { .. }))
    }

    /// Number of mode changes attempted, successful or not
    pub fn applications(&self) -> usize {
        self.events
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    WatchEvent::PermissionsApplied { .. } | WatchEvent::PermissionsFailed { .. }
                )
            })
            .count()
    }

    pub fn rules_reloaded(&self) -> bool {
        self.events
            .iter()
            .any(|event| matches!(event, WatchEvent::RulesLoaded { .. }))
    }

    fn paths_where(&self, predicate: impl Fn(&WatchEvent) -> bool) -> Vec<&Path> {
        self.events
            .iter()
            .filter(|event| predicate(*event))
            .filter_map(WatchEvent::path)
            .collect()
    }
}

/// Paths are written lossily so a non UTF-8 file name still produces an event
fn lossy_path<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}
