#![forbid(unsafe_code)]

mod cli;
mod logging;

use anyhow::{Context, Result};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use permwatch::config::{self, Settings};
use permwatch::models::WatchEvent;
use permwatch::monitor::ScanLoop;
use permwatch::output::Reporter;
use permwatch::rules;

fn main() -> Result<()> {
    let args = cli::parse_args()?;
    logging::init_logger(args.log_level.as_deref())?;

    let settings = match args.settings_path {
        Some(ref path) => Settings::load_from_file(path)?,
        None => Settings::default(),
    };
    let watch = config::resolve(&settings, &args.overrides)?;

    if rules::ensure_default_config(&watch.config_path)? {
        eprintln!("Created default rules file {}", watch.config_path.display());
    }

    // Only Ctrl-C is handled; everything else keeps its default disposition
    let interrupted = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, interrupted.clone())
        .context("Failed to install SIGINT handler")?;

    let mut scan = ScanLoop::new(&watch.root, &watch.config_path)
        .with_context(|| format!("Failed to start watching {}", watch.root.display()))?;
    let mut reporter = Reporter::stdout(watch.output, watch.quiet);

    reporter.report(&WatchEvent::RulesLoaded {
        path: scan.config_path().to_path_buf(),
        count: scan.rules().len(),
    })?;
    reporter.report(&WatchEvent::WatchStarted {
        root: scan.root().to_path_buf(),
        config_path: scan.config_path().to_path_buf(),
        interval_ms: watch.interval.as_millis() as u64,
    })?;

    scan.run(watch.interval, &interrupted, |report| {
        reporter.report_all(&report.events);
    });

    reporter.report(&WatchEvent::WatchStopped)?;
    Ok(())
}
