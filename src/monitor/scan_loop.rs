//! The polling loop that keeps the watch root in line with the rules
//!
//! Each tick walks the whole root, reloads the rules if the rules file changed,
//! classifies every walked file against the snapshot and applies the rules to
//! new and modified files. The startup walk only builds the baseline: files
//! that already exist are left alone until they change.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;

use crate::config::resolve_config_path;
use crate::constants::SLEEP_SLICE;
use crate::enforcer::{apply_rules, FsModeApplier, ModeApplier};
use crate::models::{TickReport, WatchEvent};
use crate::rules::{RuleLoadError, RuleSet};

use super::snapshot::{Change, Snapshot};
use super::walk::{modification_time, walk_tree, FileTimes, WalkError};

/// Phase of the scan loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
    ReloadingRules,
    Diffing,
    Applying,
    Stopped,
}

/// Errors that prevent the loop from starting
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to resolve watch root {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Rules(#[from] RuleLoadError),

    #[error(transparent)]
    Walk(#[from] WalkError),
}

pub struct ScanLoop<A: ModeApplier = FsModeApplier> {
    root: PathBuf,
    config_path: PathBuf,
    /// Rules file lives below the root and shows up in walks
    config_in_tree: bool,
    /// Last seen mtime of a rules file outside the root
    external_config_seen: Option<SystemTime>,
    rules: RuleSet,
    snapshot: Snapshot,
    applier: A,
    state: ScanState,
}

impl ScanLoop<FsModeApplier> {
    /// Start watching `root`, applying modes to the real filesystem
    pub fn new(root: &Path, config_path: &Path) -> Result<Self, StartupError> {
        Self::with_applier(root, config_path, FsModeApplier)
    }
}

impl<A: ModeApplier> ScanLoop<A> {
    /// Load the rules and take the baseline snapshot.
    ///
    /// A relative `config_path` is resolved against `root`. Files found by the
    /// baseline walk are tracked but not touched.
    pub fn with_applier(root: &Path, config_path: &Path, applier: A) -> Result<Self, StartupError> {
        let root = fs::canonicalize(root).map_err(|source| StartupError::Root {
            path: root.to_path_buf(),
            source,
        })?;
        let config_path = resolve_config_path(&root, config_path);

        // Observe the rules file before reading it, so an edit racing startup
        // shows up as a newer mtime on the first tick
        let baseline = walk_tree(&root)?;
        let config_in_tree = config_path.starts_with(&root);
        let external_config_seen = if config_in_tree {
            None
        } else {
            modification_time(&config_path)
        };
        let rules = RuleSet::load_from_file(&config_path)?;

        log::debug!(
            "Baseline of {} files under {}, {} rules",
            baseline.len(),
            root.display(),
            rules.len()
        );

        Ok(Self {
            root,
            config_path,
            config_in_tree,
            external_config_seen,
            rules,
            snapshot: Snapshot::from_walk(&baseline),
            applier,
            state: ScanState::Idle,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn applier(&self) -> &A {
        &self.applier
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Run one scan of the watch root
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        self.transition(ScanState::Scanning);
        let current = match walk_tree(&self.root) {
            Ok(files) => files,
            Err(err) => {
                // Leave the snapshot alone so a transient failure does not
                // report the whole tree as deleted
                log::error!("{}", err);
                report.push(WatchEvent::ScanFailed {
                    root: self.root.clone(),
                    error: err.to_string(),
                });
                self.transition(ScanState::Idle);
                return report;
            }
        };

        if let Some(mtime) = self.config_change(&current) {
            self.transition(ScanState::ReloadingRules);
            self.reload_rules(mtime, &mut report);
        }

        self.transition(ScanState::Diffing);
        let changed: Vec<(&PathBuf, SystemTime, Change)> = current
            .iter()
            .filter_map(|(path, mtime)| match self.snapshot.classify(path, *mtime) {
                Change::Unchanged => None,
                change => Some((path, *mtime, change)),
            })
            .collect();
        let vanished = self.snapshot.vanished(&current);

        self.transition(ScanState::Applying);
        for (path, mtime, change) in changed {
            report.push(match change {
                Change::New => WatchEvent::NewFile { path: path.clone() },
                _ => WatchEvent::FileModified { path: path.clone() },
            });
            for event in apply_rules(path, &self.rules, &mut self.applier) {
                report.push(event);
            }
            self.snapshot.record(path.clone(), mtime);
        }

        for path in vanished {
            self.snapshot.remove(&path);
            report.push(WatchEvent::FileDeleted { path });
        }

        self.transition(ScanState::Idle);
        report
    }

    /// Tick every `interval` until `interrupted` is set.
    ///
    /// The flag is checked before each tick and throughout the sleep, so an
    /// interrupt never waits for more than a sleep slice.
    pub fn run<F>(&mut self, interval: Duration, interrupted: &AtomicBool, mut on_tick: F)
    where
        F: FnMut(&TickReport),
    {
        while !interrupted.load(Ordering::SeqCst) {
            if !sleep_unless_interrupted(interval, interrupted) {
                break;
            }
            let report = self.tick();
            on_tick(&report);
        }
        self.transition(ScanState::Stopped);
    }

    /// New mtime of the rules file if it changed since the last reload
    fn config_change(&self, current: &FileTimes) -> Option<SystemTime> {
        let (observed, seen) = if self.config_in_tree {
            (*current.get(&self.config_path)?, self.snapshot.get(&self.config_path))
        } else {
            (modification_time(&self.config_path)?, self.external_config_seen)
        };

        match seen {
            Some(seen) if observed <= seen => None,
            _ => Some(observed),
        }
    }

    fn reload_rules(&mut self, mtime: SystemTime, report: &mut TickReport) {
        match RuleSet::load_from_file(&self.config_path) {
            Ok(rules) => {
                report.push(WatchEvent::RulesLoaded {
                    path: self.config_path.clone(),
                    count: rules.len(),
                });
                self.rules = rules;
            }
            Err(err) => {
                log::error!("Keeping previous rules: {}", err);
                report.push(WatchEvent::RulesReloadFailed {
                    path: self.config_path.clone(),
                    error: err.to_string(),
                });
            }
        }

        // Recorded even on failure so a broken file is not re-read every tick
        if self.config_in_tree {
            self.snapshot.record(self.config_path.clone(), mtime);
        } else {
            self.external_config_seen = Some(mtime);
        }
    }

    fn transition(&mut self, next: ScanState) {
        log::debug!("Scan state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Sleep for `interval`, returning `false` as soon as `interrupted` is set
fn sleep_unless_interrupted(interval: Duration, interrupted: &AtomicBool) -> bool {
    let deadline = Instant::now() + interval;
    loop {
        if interrupted.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforcer::ModeApplyError;
    use crate::rules::permissions::{translate, PermissionMode};
    use std::os::unix::fs::PermissionsExt;
    use tempfile::{tempdir, TempDir};

    /// Applies modes for real and remembers every call
    #[derive(Default)]
    struct CountingApplier {
        calls: Vec<(PathBuf, PermissionMode)>,
    }

    impl ModeApplier for CountingApplier {
        fn apply_mode(&mut self, path: &Path, mode: PermissionMode) -> Result<(), ModeApplyError> {
            self.calls.push((path.to_path_buf(), mode));
            crate::enforcer::apply_mode(path, mode)
        }
    }

    fn setup(rules: &str) -> (TempDir, ScanLoop<CountingApplier>) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("permissions.conf"), rules).unwrap();
        let scan = ScanLoop::with_applier(dir.path(), Path::new("permissions.conf"), CountingApplier::default())
            .unwrap();
        (dir, scan)
    }

    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    /// Push the mtime of `path` forward so the change is visible regardless of
    /// filesystem timestamp granularity
    fn bump_mtime(path: &Path, secs: u64) {
        let mtime = fs::metadata(path).unwrap().modified().unwrap() + Duration::from_secs(secs);
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
    }

    #[test]
    fn test_baseline_does_not_apply_rules() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("permissions.conf"), "*.sh x\n").unwrap();
        fs::write(dir.path().join("existing.sh"), "echo\n").unwrap();
        fs::set_permissions(dir.path().join("existing.sh"), fs::Permissions::from_mode(0o644)).unwrap();

        let mut scan =
            ScanLoop::with_applier(dir.path(), Path::new("permissions.conf"), CountingApplier::default())
                .unwrap();

        assert_eq!(scan.snapshot().len(), 2);
        assert_eq!(scan.state(), ScanState::Idle);

        let report = scan.tick();
        assert!(report.is_empty());
        assert!(scan.applier().calls.is_empty());
        assert_eq!(mode_of(&dir.path().join("existing.sh")), 0o644);
    }

    #[test]
    fn test_new_file_gets_mode() {
        let (_dir, mut scan) = setup("*.sh x\n");
        let script = scan.root().join("run.sh");
        fs::write(&script, "echo\n").unwrap();

        let report = scan.tick();

        assert_eq!(report.new_files(), vec![script.as_path()]);
        assert_eq!(report.applications(), 1);
        assert_eq!(mode_of(&script), translate("x").bits());
        assert!(scan.snapshot().contains(&script));
    }

    #[test]
    fn test_new_file_without_matching_rule() {
        let (_dir, mut scan) = setup("*.sh x\n");
        let notes = scan.root().join("notes.md");
        fs::write(&notes, "hi\n").unwrap();

        let report = scan.tick();
        assert_eq!(report.new_files(), vec![notes.as_path()]);
        assert_eq!(report.applications(), 0);
        assert!(scan.snapshot().contains(&notes));
    }

    #[test]
    fn test_second_tick_without_changes_is_quiet() {
        let (_dir, mut scan) = setup("*.txt rw\n");
        fs::write(scan.root().join("a.txt"), "a").unwrap();
        fs::create_dir(scan.root().join("sub")).unwrap();
        fs::write(scan.root().join("sub/b.txt"), "b").unwrap();

        let first = scan.tick();
        assert_eq!(first.new_files().len(), 2);
        let calls_after_first = scan.applier().calls.len();
        assert_eq!(calls_after_first, 2);

        let second = scan.tick();
        assert!(second.is_empty());
        assert_eq!(scan.applier().calls.len(), calls_after_first);
    }

    #[test]
    fn test_modified_file_is_reapplied() {
        let (_dir, mut scan) = setup("*.txt rw\n");
        let file = scan.root().join("a.txt");
        fs::write(&file, "a").unwrap();
        scan.tick();

        fs::set_permissions(&file, fs::Permissions::from_mode(0o600)).unwrap();
        bump_mtime(&file, 5);
        let report = scan.tick();

        assert_eq!(report.modified_files(), vec![file.as_path()]);
        assert!(report.new_files().is_empty());
        assert_eq!(mode_of(&file), translate("rw").bits());
        assert_eq!(
            scan.snapshot().get(&file),
            Some(fs::metadata(&file).unwrap().modified().unwrap())
        );
    }

    #[test]
    fn test_deleted_file_is_forgotten_without_apply() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("permissions.conf"), "*.log r\n").unwrap();
        fs::write(dir.path().join("old.log"), "x").unwrap();
        let mut scan =
            ScanLoop::with_applier(dir.path(), Path::new("permissions.conf"), CountingApplier::default())
                .unwrap();
        let file = scan.root().join("old.log");
        assert!(scan.snapshot().contains(&file));

        fs::remove_file(&file).unwrap();
        let report = scan.tick();

        assert_eq!(report.deleted_files(), vec![file.as_path()]);
        assert_eq!(report.applications(), 0);
        assert!(scan.applier().calls.is_empty());
        assert!(!scan.snapshot().contains(&file));

        assert!(scan.tick().is_empty());
    }

    #[test]
    fn test_every_matching_rule_applied_last_wins() {
        let (_dir, mut scan) = setup("*.txt r\n*.txt w\n");
        let file = scan.root().join("file.txt");
        fs::write(&file, "x").unwrap();

        scan.tick();

        let modes: Vec<PermissionMode> = scan.applier().calls.iter().map(|(_, mode)| *mode).collect();
        assert_eq!(modes, vec![translate("r"), translate("w")]);
        assert_eq!(mode_of(&file), translate("w").bits());
    }

    #[test]
    fn test_config_change_reloads_before_classification() {
        let (_dir, mut scan) = setup("*.sh x\n");
        let config = scan.config_path().to_path_buf();

        fs::write(&config, "*.sh x\n*.txt r\n").unwrap();
        bump_mtime(&config, 5);
        let file = scan.root().join("fresh.txt");
        fs::write(&file, "x").unwrap();

        let report = scan.tick();

        assert!(report.rules_reloaded());
        assert!(matches!(report.events[0], WatchEvent::RulesLoaded { count: 2, .. }));
        assert_eq!(scan.rules().len(), 2);
        // The reload is not also reported as a modification
        assert!(report.modified_files().is_empty());
        assert_eq!(report.new_files(), vec![file.as_path()]);
        assert_eq!(mode_of(&file), translate("r").bits());

        assert!(scan.tick().is_empty());
    }

    #[test]
    fn test_deleted_config_keeps_rules_until_recreated() {
        let (_dir, mut scan) = setup("*.sh x\n");
        let config = scan.config_path().to_path_buf();

        fs::remove_file(&config).unwrap();
        let report = scan.tick();
        assert_eq!(report.deleted_files(), vec![config.as_path()]);
        assert_eq!(scan.rules().len(), 1);

        fs::write(&config, "*.sh x\n*.py r\n*.log rw\n").unwrap();
        let report = scan.tick();
        assert!(report.rules_reloaded());
        assert!(report.new_files().is_empty());
        assert_eq!(scan.rules().len(), 3);
    }

    #[test]
    fn test_config_outside_root_is_tracked() {
        let root = tempdir().unwrap();
        let elsewhere = tempdir().unwrap();
        let config = elsewhere.path().join("rules.conf");
        fs::write(&config, "*.sh x\n").unwrap();

        let mut scan = ScanLoop::with_applier(root.path(), &config, CountingApplier::default()).unwrap();
        assert!(scan.tick().is_empty());

        fs::write(&config, "*.sh rx\n").unwrap();
        bump_mtime(&config, 5);
        let report = scan.tick();

        assert!(report.rules_reloaded());
        assert!(report.deleted_files().is_empty());
        assert_eq!(scan.rules().iter().next().map(|r| r.perm_spec.as_str()), Some("rx"));
        assert!(scan.tick().is_empty());
    }

    #[test]
    fn test_unreadable_root_skips_tick() {
        let parent = tempdir().unwrap();
        let root = parent.path().join("watched");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("permissions.conf"), "*.sh x\n").unwrap();
        let mut scan = ScanLoop::with_applier(&root, Path::new("permissions.conf"), CountingApplier::default())
            .unwrap();
        let tracked = scan.snapshot().len();

        fs::remove_dir_all(&root).unwrap();
        let report = scan.tick();

        assert_eq!(report.events.len(), 1);
        assert!(report.events[0].is_error());
        assert_eq!(scan.snapshot().len(), tracked);
        assert_eq!(scan.state(), ScanState::Idle);
    }

    #[test]
    fn test_baseline_mtime_of_rules_file_predates_load() {
        let (_dir, mut scan) = setup("*.sh x\n");
        let config = scan.config_path().to_path_buf();
        let loaded_at = fs::metadata(&config).unwrap().modified().unwrap();

        assert_eq!(scan.snapshot().get(&config), Some(loaded_at));
        assert!(scan.tick().is_empty());

        // A baseline older than the file on disk forces a reload on the next tick
        scan.snapshot.record(config.clone(), loaded_at - Duration::from_secs(5));
        fs::write(&config, "*.sh x\n*.py r\n").unwrap();
        fs::File::options().write(true).open(&config).unwrap().set_modified(loaded_at).unwrap();

        let report = scan.tick();
        assert!(report.rules_reloaded());
        assert!(report.modified_files().is_empty());
        assert_eq!(scan.rules().len(), 2);
    }

    #[test]
    fn test_startup_fails_without_rules_file() {
        let dir = tempdir().unwrap();
        let err = ScanLoop::new(dir.path(), Path::new("permissions.conf")).err().unwrap();
        assert!(matches!(err, StartupError::Rules(_)));
    }

    #[test]
    fn test_startup_fails_on_missing_root() {
        let dir = tempdir().unwrap();
        let err = ScanLoop::new(&dir.path().join("missing"), Path::new("permissions.conf"))
            .err()
            .unwrap();
        assert!(matches!(err, StartupError::Root { .. }));
    }

    #[test]
    fn test_run_stops_when_interrupted() {
        let (_dir, mut scan) = setup("*.sh x\n");
        fs::write(scan.root().join("run.sh"), "echo\n").unwrap();
        let interrupted = AtomicBool::new(false);
        let mut reports = Vec::new();

        scan.run(Duration::from_millis(10), &interrupted, |report| {
            reports.push(report.clone());
            interrupted.store(true, Ordering::SeqCst);
        });

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].new_files().len(), 1);
        assert_eq!(scan.state(), ScanState::Stopped);
    }

    #[test]
    fn test_run_exits_immediately_when_already_interrupted() {
        let (_dir, mut scan) = setup("*.sh x\n");
        let interrupted = AtomicBool::new(true);
        let mut ticks = 0;

        scan.run(Duration::from_secs(60), &interrupted, |_| ticks += 1);

        assert_eq!(ticks, 0);
        assert_eq!(scan.state(), ScanState::Stopped);
    }
}
