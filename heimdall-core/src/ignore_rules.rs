//! `.heimdallignore` rule compilation
//!
//! Rules are glob patterns, one per line. A rule with a trailing `/` only
//! matches directories. Everything else is tried against both the base name
//! and the full root-relative path. Ignoring is the OR of all rules.

use crate::error::{HeimdallError, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::Path;
use tracing::debug;

pub const IGNORE_FILE_NAME: &str = ".heimdallignore";

/// Compiled ignore predicate over root-relative paths
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    any: GlobSet,
    dirs_only: GlobSet,
    rules: Vec<String>,
}

impl IgnoreMatcher {
    /// A matcher that ignores nothing
    pub fn empty() -> Self {
        Self { any: GlobSet::empty(), dirs_only: GlobSet::empty(), rules: Vec::new() }
    }

    /// Read `.heimdallignore` from `root`; a missing file ignores nothing.
    pub fn compile(root: &Path) -> Result<Self> {
        Self::compile_with(root, std::iter::empty::<&str>())
    }

    /// Like [`compile`](Self::compile), with additional rules appended.
    pub fn compile_with<I, S>(root: &Path, extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ignore_path = root.join(IGNORE_FILE_NAME);
        let mut lines: Vec<String> = Vec::new();

        if ignore_path.is_file() {
            let bytes = fs::read(&ignore_path).map_err(|e| {
                HeimdallError::config(format!("cannot read {:?}: {}", ignore_path, e))
            })?;
            let text = String::from_utf8(bytes).map_err(|_| {
                HeimdallError::config(format!("{:?} is not valid UTF-8", ignore_path))
            })?;
            lines.extend(text.lines().map(str::to_string));
            debug!("Loaded ignore file {:?}", ignore_path);
        }

        lines.extend(extra.into_iter().map(|s| s.as_ref().to_string()));
        Self::from_rules(lines)
    }

    /// Build a matcher from raw rule lines. Blank lines and `#` comments are skipped.
    pub fn from_rules<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut any = GlobSetBuilder::new();
        let mut dirs_only = GlobSetBuilder::new();
        let mut rules = Vec::new();

        for line in lines {
            let rule = line.as_ref().trim();
            if rule.is_empty() || rule.starts_with('#') {
                continue;
            }

            let (pattern, dir_rule) = match rule.strip_suffix('/') {
                Some(stripped) => (stripped.trim_end_matches('/'), true),
                None => (rule, false),
            };
            if pattern.is_empty() {
                continue;
            }

            let glob = GlobBuilder::new(pattern).literal_separator(false).build().map_err(|e| {
                HeimdallError::config(format!("invalid ignore rule '{}': {}", rule, e))
            })?;

            if dir_rule {
                dirs_only.add(glob);
            } else {
                any.add(glob);
            }
            rules.push(rule.to_string());
        }

        let build = |builder: GlobSetBuilder| {
            builder
                .build()
                .map_err(|e| HeimdallError::config(format!("invalid ignore rules: {}", e)))
        };

        Ok(Self { any: build(any)?, dirs_only: build(dirs_only)?, rules })
    }

    /// Whether `relative_path` (`/`-separated, relative to the root) is ignored.
    pub fn should_ignore(&self, relative_path: &str, is_dir: bool) -> bool {
        let relative_path = relative_path.trim_matches('/');
        if relative_path.is_empty() {
            return false;
        }
        let base_name = relative_path.rsplit('/').next().unwrap_or(relative_path);

        let hit = |set: &GlobSet| set.is_match(base_name) || set.is_match(relative_path);

        hit(&self.any) || (is_dir && hit(&self.dirs_only))
    }

    /// Rule texts in file order
    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for IgnoreMatcher {
    fn default() -> Self {
        Self::empty()
    }
}
