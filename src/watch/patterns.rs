// src/watch/patterns.rs

use std::fmt;
use std::path::{Component, Path};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;

use crate::config::WatchSettings;

/// Decides which changed paths should trigger a build.
///
/// A path passes when:
/// - its basename matches an include glob, or the whole path matches the
///   regex pattern, and
/// - its basename matches no exclude glob, and
/// - none of its directories (relative to the watched root) match an
///   exclude-dir glob, either by name or by relative path.
#[derive(Clone)]
pub struct PathFilter {
    pattern: Regex,
    include: GlobSet,
    exclude: GlobSet,
    exclude_dirs: GlobSet,
}

impl fmt::Debug for PathFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathFilter")
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

impl PathFilter {
    pub fn from_settings(settings: &WatchSettings) -> Result<Self> {
        let pattern = Regex::new(&settings.pattern)
            .with_context(|| format!("invalid file pattern {:?}", settings.pattern))?;

        Ok(Self {
            pattern,
            include: build_globset(&settings.include).context("building include globset")?,
            exclude: build_globset(&settings.exclude).context("building exclude globset")?,
            exclude_dirs: build_globset(&settings.exclude_dir)
                .context("building exclude-dir globset")?,
        })
    }

    /// Whether a change to `path`, found under the watched directory `root`,
    /// should trigger a build.
    pub fn accepts(&self, root: &Path, path: &Path) -> bool {
        let rel = path.strip_prefix(root).unwrap_or(path);
        !self.in_excluded_dir(rel) && self.matches_file(path)
    }

    fn matches_file(&self, path: &Path) -> bool {
        let Some(base) = path.file_name() else {
            return false;
        };
        let full = path.to_string_lossy().replace('\\', "/");

        (self.include.is_match(base) || self.pattern.is_match(&full))
            && !self.exclude.is_match(base)
    }

    fn in_excluded_dir(&self, rel: &Path) -> bool {
        let Some(parent) = rel.parent() else {
            return false;
        };

        let mut prefix = String::new();
        for component in parent.components() {
            let Component::Normal(name) = component else {
                continue;
            };
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(&name.to_string_lossy());

            if self.exclude_dirs.is_match(name) || self.exclude_dirs.is_match(&prefix) {
                return true;
            }
        }
        false
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
