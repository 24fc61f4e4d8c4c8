//! Permission rules
//!
//! A rules file holds one `<glob-pattern> <permission-spec>` pair per line.
//! Blank lines and lines starting with `#` are ignored, and any line that does
//! not split into exactly two whitespace-separated tokens is skipped silently.
//! Rule order is kept: every matching rule is applied in turn, so a later rule
//! overrides an earlier one for the same file.

pub mod pattern_matcher;
pub mod permissions;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::DEFAULT_CONFIG_CONTENT;
use self::permissions::{translate, PermissionMode};

/// Errors raised while reading or bootstrapping the rules file
#[derive(Debug, Error)]
pub enum RuleLoadError {
    #[error("Failed to read rules file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create default rules file {path}: {source}")]
    CreateDefault {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A single `(pattern, permission-spec)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: String,
    pub perm_spec: String,
}

impl Rule {
    pub fn new(pattern: impl Into<String>, perm_spec: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            perm_spec: perm_spec.into(),
        }
    }

    /// Mode this rule sets on a matching file
    pub fn mode(&self) -> PermissionMode {
        translate(&self.perm_spec)
    }

    fn from_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let mut tokens = line.split_whitespace();
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(pattern), Some(perm_spec), None) => Some(Self::new(pattern, perm_spec)),
            _ => None,
        }
    }
}

/// Ordered collection of rules, rebuilt wholesale on every reload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse rules from line-oriented text
    pub fn parse(source: &str) -> Self {
        source.lines().filter_map(Rule::from_line).collect()
    }

    /// Read and parse a rules file
    pub fn load_from_file(path: &Path) -> Result<Self, RuleLoadError> {
        let bytes = fs::read(path).map_err(|source| RuleLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let rules = Self::parse(&String::from_utf8_lossy(&bytes));
        log::info!("Loaded {} rules from {}", rules.len(), path.display());
        Ok(rules)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// Write the seed rules file if `path` does not exist yet.
///
/// Returns `true` when a new file was created.
pub fn ensure_default_config(path: &Path) -> Result<bool, RuleLoadError> {
    if path.exists() {
        return Ok(false);
    }

    fs::write(path, DEFAULT_CONFIG_CONTENT).map_err(|source| RuleLoadError::CreateDefault {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Created default rules file {}", path.display());
    Ok(true)
}
