//! Version history for a working tree
//!
//! This crate provides:
//! - Version ids (`v<generation>-<index>`) and their allocation
//! - `meta.json` and `change_log.json` formats
//! - Tree diff against a parent version
//! - Version creation with single storage of unchanged files
//! - Restore with drift removal and staged apply

pub mod archive;
pub mod change_log;
pub mod diff;
pub mod meta;
pub mod restore;
pub mod version;

// Re-exports
pub use archive::{Archive, SnapshotOptions};
pub use change_log::{ChangeLog, ChangeLogEntry};
pub use diff::TreeDiff;
pub use meta::{ChangeEntry, ChangeKind, NoChangeEntry, VersionMeta};
pub use restore::{RestoreEngine, RestoreReport, RestoreWarning};
pub use version::VersionId;

use serde_json::Value;
use std::path::Path;
use treesnap_core::{IgnoreSet, Result};

/// Snapshot `root` as a new version
///
/// `ignore_patterns` replaces the default ignore list when given.
pub fn create(
    root: &Path,
    ignore_patterns: Option<&[String]>,
    parent: Option<&str>,
    summary: &str,
    chat: Value,
) -> Result<VersionId> {
    let parent = parent.map(str::parse::<VersionId>).transpose()?;

    let mut options = SnapshotOptions::default();
    if let Some(patterns) = ignore_patterns {
        options.ignore = IgnoreSet::new(patterns)?;
    }

    Archive::with_options(root, options).create(parent, summary, chat)
}

/// Recognized versions under `root`, ordered by generation then index
pub fn list(root: &Path) -> Result<Vec<VersionId>> {
    Archive::open(root).list()
}

/// Restore `root` to `version`
pub fn restore(root: &Path, version: &str, overwrite: bool) -> Result<RestoreReport> {
    let version: VersionId = version.parse()?;
    Archive::open(root).restore(&version, overwrite)
}
