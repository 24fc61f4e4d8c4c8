//! Configuration management
//!
//! Handles the optional TOML settings file, interval validation and merging
//! with command-line flags into a `WatchConfiguration`. Precedence is
//! CLI flag, then settings file, then built-in default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::constants::{
    DEFAULT_CONFIG_FILE, DEFAULT_POLLING_INTERVAL, MAX_POLLING_INTERVAL_SECS, MIN_POLLING_INTERVAL_SECS,
};
use crate::models::{OutputFormat, WatchConfiguration};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Note: bounds must match MIN/MAX_POLLING_INTERVAL_SECS in constants.rs
    #[error("Invalid polling interval: {0}. Must be between 0.1 and 300.0 seconds")]
    InvalidInterval(f64),

    #[error("Watch root {path} is not usable: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Contents of the optional settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub daemon: DaemonSettings,
    pub watch: WatchSettings,
    pub output: OutputSettings,
}

/// Core daemon runtime settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonSettings {
    /// Polling interval in seconds (0.1-300.0)
    pub polling_interval: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchSettings {
    /// Directory to watch recursively
    pub root: Option<PathBuf>,
    /// Rules file, relative paths resolve against the root
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    pub json: Option<bool>,
    pub quiet: Option<bool>,
}

impl Settings {
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Values given on the command line; `None`/`false` defers to the settings file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub root: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub interval: Option<f64>,
    pub json: bool,
    pub quiet: bool,
}

/// Check a polling interval in seconds and convert it
pub fn validate_interval(secs: f64) -> Result<Duration, SettingsError> {
    if !(MIN_POLLING_INTERVAL_SECS..=MAX_POLLING_INTERVAL_SECS).contains(&secs) {
        return Err(SettingsError::InvalidInterval(secs));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// Merge CLI flags and settings into the configuration used by the daemon
pub fn resolve(settings: &Settings, overrides: &CliOverrides) -> Result<WatchConfiguration, SettingsError> {
    let root = match overrides.root.as_ref().or(settings.watch.root.as_ref()) {
        Some(root) => root.clone(),
        None => std::env::current_dir().map_err(|source| SettingsError::Root {
            path: PathBuf::from("."),
            source,
        })?,
    };
    let root = fs::canonicalize(&root).map_err(|source| SettingsError::Root { path: root, source })?;
    if !root.is_dir() {
        return Err(SettingsError::Root {
            source: io::Error::new(io::ErrorKind::Other, "not a directory"),
            path: root,
        });
    }

    let config = overrides
        .config
        .as_ref()
        .or(settings.watch.config.as_ref())
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let interval = match overrides.interval.or(settings.daemon.polling_interval) {
        Some(secs) => validate_interval(secs)?,
        None => DEFAULT_POLLING_INTERVAL,
    };

    let output = if overrides.json || settings.output.json.unwrap_or(false) {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    Ok(WatchConfiguration {
        config_path: resolve_config_path(&root, &config),
        root,
        interval,
        output,
        quiet: overrides.quiet || settings.output.quiet.unwrap_or(false),
    })
}

/// Absolute path of the rules file.
///
/// Relative paths are taken from `root`. The parent directory is canonicalised
/// so the result compares equal to the path produced by walking the root,
/// while the file name itself is kept even if it is a symlink.
pub fn resolve_config_path(root: &Path, config: &Path) -> PathBuf {
    let joined = if config.is_absolute() {
        config.to_path_buf()
    } else {
        root.join(config)
    };

    match (joined.parent(), joined.file_name()) {
        (Some(parent), Some(name)) => fs::canonicalize(parent)
            .map(|parent| parent.join(name))
            .unwrap_or(joined),
        _ => joined,
    }
}
