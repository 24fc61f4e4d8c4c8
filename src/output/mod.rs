//! Output formatting module
//!
//! Handles:
//! - Human-readable status lines for operators
//! - JSON-lines output, one object per event with an ISO 8601 timestamp
//! - Quiet mode, which drops successful per-file applications

use anyhow::Result;
use serde_json::Value;
use std::io::{self, Write};
use time::format_description::well_known::Iso8601;
use time::OffsetDateTime;

use crate::models::{OutputFormat, WatchEvent};

/// Renders events to a writer, stdout in production
pub struct Reporter<W: Write> {
    writer: W,
    format: OutputFormat,
    quiet: bool,
}

impl Reporter<io::Stdout> {
    pub fn stdout(format: OutputFormat, quiet: bool) -> Self {
        Self::new(io::stdout(), format, quiet)
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(writer: W, format: OutputFormat, quiet: bool) -> Self {
        Self { writer, format, quiet }
    }

    /// Write a single event, honouring quiet mode
    pub fn report(&mut self, event: &WatchEvent) -> Result<()> {
        if self.quiet && matches!(event, WatchEvent::PermissionsApplied { .. }) {
            return Ok(());
        }

        match self.format {
            OutputFormat::Human => writeln!(self.writer, "{}", format_human(event))?,
            OutputFormat::Json => writeln!(self.writer, "{}", format_json(event, OffsetDateTime::now_utc())?)?,
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Write every event; a failed event is logged and the rest still go out.
    ///
    /// Returns the number of events that could not be written.
    pub fn report_all<'a>(&mut self, events: impl IntoIterator<Item = &'a WatchEvent>) -> usize {
        let mut failed = 0;
        for event in events {
            if let Err(err) = self.report(event) {
                log::error!("Failed to write event: {:#}", err);
                failed += 1;
            }
        }
        failed
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Human-readable line for an event
pub fn format_human(event: &WatchEvent) -> String {
    match event {
        WatchEvent::WatchStarted { root, config_path, interval_ms } => format!(
            "Watching directory: {} (rules: {}, interval: {:.1}s)",
            root.display(),
            config_path.display(),
            *interval_ms as f64 / 1000.0
        ),
        WatchEvent::RulesLoaded { count, .. } => format!("Loaded {} rules.", count),
        WatchEvent::RulesReloadFailed { path, error } => {
            format!("Error reloading rules from {}: {}", path.display(), error)
        }
        WatchEvent::NewFile { path } => format!("New file detected: {}", path.display()),
        WatchEvent::FileModified { path } => format!("File modified: {}", path.display()),
        WatchEvent::FileDeleted { path } => format!("File deleted: {}", path.display()),
        WatchEvent::PermissionsApplied { path, perm_spec, .. } => {
            format!("Applied permissions {} to {}", perm_spec, path.display())
        }
        WatchEvent::PermissionsFailed { path, error, .. } => {
            format!("Error applying permissions to {}: {}", path.display(), error)
        }
        WatchEvent::ScanFailed { root, error } => {
            format!("Error scanning {}: {}", root.display(), error)
        }
        WatchEvent::WatchStopped => "Stopping daemon.".to_string(),
    }
}

/// JSON object for an event, stamped with `at`
pub fn format_json(event: &WatchEvent, at: OffsetDateTime) -> Result<String> {
    let mut value = serde_json::to_value(event)?;
    if let Value::Object(fields) = &mut value {
        fields.insert("timestamp".to_string(), Value::String(at.format(&Iso8601::DEFAULT)?));
    }
    Ok(value.to_string())
}
