//! Diagnostic logging
//!
//! Operator events go to stdout through `output`; everything else goes through
//! the `log` facade to stderr. The level comes from `--log-level`, falling back
//! to `RUST_LOG` and then to `warn`.

use anyhow::{anyhow, Result};
use env_logger::{Builder, Env, Target};

/// Levels accepted by `--log-level`
pub const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

/// Install the global logger
pub fn init_logger(level: Option<&str>) -> Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.parse_filters(level);
    }

    builder
        .target(Target::Stderr)
        .format_timestamp_secs()
        .try_init()
        .map_err(|e| anyhow!("Failed to set logger: {}", e))
}
