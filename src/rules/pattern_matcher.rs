//! Glob matching of file names against rule patterns
//!
//! Patterns use shell-glob syntax (`*`, `?`, `[...]`, `[!...]`) and are matched
//! case-sensitively against the base name of a path only. A pattern the glob
//! engine rejects falls back to exact string comparison.

use glob::Pattern;
use std::borrow::Cow;
use std::path::Path;

use super::{Rule, RuleSet};

/// Check if a pattern string contains glob pattern characters
pub fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?') || pattern.contains('[')
}

/// Match a file name against a single rule pattern
pub fn matches(filename: &str, pattern: &str) -> bool {
    if !is_glob_pattern(pattern) {
        return filename == pattern;
    }

    match Pattern::new(&collapse_stars(pattern)) {
        Ok(compiled) => compiled.matches(filename),
        Err(_) => filename == pattern,
    }
}

/// Base name of `path`, the only part of a path that patterns see
pub fn base_name(path: &Path) -> Option<Cow<'_, str>> {
    path.file_name().map(|name| name.to_string_lossy())
}

/// Rules whose pattern matches the base name of `path`, in declaration order
pub fn matching_rules<'a>(path: &Path, rules: &'a RuleSet) -> Vec<&'a Rule> {
    let Some(name) = base_name(path) else {
        return Vec::new();
    };

    rules
        .iter()
        .filter(|rule| matches(&name, &rule.pattern))
        .collect()
}

// The glob crate rejects `**` next to other characters; on a base name it
// means the same as `*`.
fn collapse_stars(pattern: &str) -> Cow<'_, str> {
    if !pattern.contains("**") {
        return Cow::Borrowed(pattern);
    }

    let mut collapsed = String::with_capacity(pattern.len());
    let mut previous_star = false;
    for c in pattern.chars() {
        if c == '*' && previous_star {
            continue;
        }
        previous_star = c == '*';
        collapsed.push(c);
    }
    Cow::Owned(collapsed)
}
