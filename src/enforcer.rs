//! Applying rule modes to files
//!
//! Every rule matching a file's base name is applied in declaration order.
//! Each application replaces the whole permission set, so the last matching
//! rule decides the final mode. Failures are reported per rule and never stop
//! the remaining rules.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::WatchEvent;
use crate::rules::pattern_matcher::matching_rules;
use crate::rules::permissions::PermissionMode;
use crate::rules::RuleSet;

/// chmod failure for a single file
#[derive(Debug, Error)]
#[error("{path}: {source}")]
pub struct ModeApplyError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Sets permission bits on a path
pub trait ModeApplier {
    fn apply_mode(&mut self, path: &Path, mode: PermissionMode) -> Result<(), ModeApplyError>;
}

/// Applies modes to the real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsModeApplier;

impl ModeApplier for FsModeApplier {
    fn apply_mode(&mut self, path: &Path, mode: PermissionMode) -> Result<(), ModeApplyError> {
        apply_mode(path, mode)
    }
}

/// Replace the permission bits of `path` with exactly `mode`
pub fn apply_mode(path: &Path, mode: PermissionMode) -> Result<(), ModeApplyError> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode.bits())).map_err(|source| {
        ModeApplyError {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Apply every rule matching `path`, returning one event per application
pub fn apply_rules<A: ModeApplier + ?Sized>(
    path: &Path,
    rules: &RuleSet,
    applier: &mut A,
) -> Vec<WatchEvent> {
    let mut events = Vec::new();

    for rule in matching_rules(path, rules) {
        let mode = rule.mode();
        match applier.apply_mode(path, mode) {
            Ok(()) => {
                log::debug!("Set mode {} on {} (pattern '{}')", mode, path.display(), rule.pattern);
                events.push(WatchEvent::PermissionsApplied {
                    path: path.to_path_buf(),
                    perm_spec: rule.perm_spec.clone(),
                    mode: mode.to_string(),
                });
            }
            Err(err) => {
                log::warn!("Failed to set mode {} on {}: {}", mode, path.display(), err.source);
                events.push(WatchEvent::PermissionsFailed {
                    path: path.to_path_buf(),
                    perm_spec: rule.perm_spec.clone(),
                    error: err.source.to_string(),
                });
            }
        }
    }

    events
}
