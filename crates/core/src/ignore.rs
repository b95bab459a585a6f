//! Glob-based ignore rules, matched against root-relative `/`-separated paths

use crate::error::SnapError;
use crate::Result;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Generated entry points and archive bookkeeping that are never tracked
pub const DEFAULT_IGNORE: &[&str] = &[
    "index.html",
    "style.css",
    "archive/**",
    "change_log.json",
    "chat_history.json",
    "meta.json",
];

/// Compiled set of ignore patterns
///
/// `*` matches across `/`, like shell-style `fnmatch`, so `*.png` ignores
/// `assets/hero.png` as well as `hero.png`.
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl IgnoreSet {
    /// Compile a caller-supplied list; it replaces the defaults entirely
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut builder = GlobSetBuilder::new();

        for pattern in &patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(false)
                .build()
                .map_err(|e| SnapError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
            builder.add(glob);
        }

        let set = builder.build().map_err(|e| SnapError::InvalidPattern {
            pattern: patterns.join(", "),
            reason: e.to_string(),
        })?;

        Ok(Self { patterns, set })
    }

    /// A set that ignores nothing (the archive directory is still skipped by the scanner)
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    pub fn is_ignored(&self, rel_path: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let normalized = rel_path.replace('\\', "/");
        self.set.is_match(normalized.as_str())
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for IgnoreSet {
    fn default() -> Self {
        // The default patterns are static and known to compile
        Self::new(DEFAULT_IGNORE.iter().copied()).unwrap_or_else(|_| Self::empty())
    }
}
