//! Global constants for permwatch
//!
//! Centralized location for defaults shared by the CLI, settings file and scan loop

use std::time::Duration;

/// Rules file name looked up in the watch root when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "permissions.conf";

/// Delay between two scans of the watch root
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(1);

/// Accepted polling interval range, in seconds
pub const MIN_POLLING_INTERVAL_SECS: f64 = 0.1;
pub const MAX_POLLING_INTERVAL_SECS: f64 = 300.0;

/// Granularity of the interruptible sleep between ticks
pub const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Contents written when the rules file is missing at startup
pub const DEFAULT_CONFIG_CONTENT: &str = "\
# Add your permission rules here.
# For example:
# *.log r
# *.tmp rw
*.py r
";
