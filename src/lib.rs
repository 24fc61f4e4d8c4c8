//! permwatch - rule-driven file permission daemon
//!
//! Polls a directory tree, detects new, modified and deleted files, and sets
//! the mode of new and modified files from glob rules read from a plain-text
//! rules file.

pub mod config;
pub mod constants;
pub mod enforcer;
pub mod models;
pub mod monitor;
pub mod output;
pub mod rules;

pub use enforcer::{FsModeApplier, ModeApplier};
pub use models::{TickReport, WatchConfiguration, WatchEvent};
pub use monitor::{ScanLoop, ScanState};
pub use rules::permissions::{translate, PermissionMode};
pub use rules::{Rule, RuleSet};
