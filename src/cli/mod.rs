//! CLI argument parsing and validation module
//!
//! Handles command-line interface using clap, including:
//! - Watch root and rules file selection
//! - Polling interval
//! - Optional TOML settings file
//! - Output format selection (human/JSON) and quiet mode
//! - Diagnostic log level

use anyhow::{anyhow, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

use crate::logging::LOG_LEVELS;
use permwatch::config::{validate_interval, CliOverrides};

/// Parsed command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    pub overrides: CliOverrides,
    pub settings_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

pub fn build_command() -> Command {
    Command::new("permwatch")
        .version(env!("PERMWATCH_VERSION"))
        .long_version(concat!(env!("PERMWATCH_VERSION"), " (", env!("GIT_HASH"), ")"))
        .about("Keep file permissions in a directory tree in line with glob rules")
        .long_about(
            "Polls a directory tree and sets the mode of every new or modified file \
             from the rules in a plain-text rules file. Each rule line is \
             '<glob-pattern> <perms>' where perms combines r, w and x. The rules file \
             is reloaded whenever it changes. Press Ctrl+C to stop.",
        )
        .arg(
            Arg::new("root")
                .short('r')
                .long("root")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Directory to watch recursively [default: current directory]"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Rules file, relative to the watch root [default: permissions.conf]"),
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .value_name("SECONDS")
                .value_parser(value_parser!(f64))
                .help("Polling interval in seconds (0.1-300) [default: 1]"),
        )
        .arg(
            Arg::new("settings")
                .short('s')
                .long("settings")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("TOML settings file"),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .help("Output events as JSON lines")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Do not print a line for every permission change")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .value_parser(LOG_LEVELS.to_vec())
                .help("Diagnostic log level on stderr (overrides RUST_LOG)"),
        )
}

/// Parse command line arguments and return configuration
pub fn parse_args() -> Result<CliArgs> {
    args_from_matches(&build_command().get_matches())
}

fn args_from_matches(matches: &ArgMatches) -> Result<CliArgs> {
    let root = matches.get_one::<PathBuf>("root").cloned();
    if let Some(ref root) = root {
        if !root.exists() {
            return Err(anyhow!("Path does not exist: {}", root.display()));
        }
        if !root.is_dir() {
            return Err(anyhow!("Not a directory: {}", root.display()));
        }
    }

    let interval = matches.get_one::<f64>("interval").copied();
    if let Some(secs) = interval {
        validate_interval(secs).context("Invalid --interval")?;
    }

    Ok(CliArgs {
        overrides: CliOverrides {
            root,
            config: matches.get_one::<PathBuf>("config").cloned(),
            interval,
            json: matches.get_flag("json"),
            quiet: matches.get_flag("quiet"),
        },
        settings_path: matches.get_one::<PathBuf>("settings").cloned(),
        log_level: matches.get_one::<String>("log-level").cloned(),
    })
}
