//! Version store: creates and lists versions of a working tree
//!
//! An [`Archive`] is the explicit context for every operation on one working
//! tree. It owns the layout, ignore rules and scanning options; callers
//! decide how long it lives.

use crate::change_log::{ChangeLog, ChangeLogEntry};
use crate::diff::TreeDiff;
use crate::meta::{timestamp, VersionMeta};
use crate::restore::{RestoreEngine, RestoreReport};
use crate::version::VersionId;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use treesnap_core::store::{copy_preserving, join_relative, ArchiveLayout};
use treesnap_core::{ErrorKind, IgnoreSet, IoResultExt, Result, SnapError, TreeScanner};

/// Options shared by create and restore
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    /// Paths never tracked, and never touched by restore
    pub ignore: IgnoreSet,
    /// Hash files on the rayon pool
    pub parallel_hash: bool,
    /// New versions become the current line in the change log
    pub mark_current: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            ignore: IgnoreSet::default(),
            parallel_hash: true,
            mark_current: true,
        }
    }
}

/// Handle on the archive beneath a working tree
#[derive(Debug, Clone)]
pub struct Archive {
    layout: ArchiveLayout,
    options: SnapshotOptions,
}

impl Archive {
    /// Open the archive of `root` with default options
    ///
    /// Nothing is created on disk until the first [`Archive::create`].
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self::with_options(root, SnapshotOptions::default())
    }

    pub fn with_options(root: impl Into<PathBuf>, options: SnapshotOptions) -> Self {
        Self {
            layout: ArchiveLayout::new(root),
            options,
        }
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    pub fn options(&self) -> &SnapshotOptions {
        &self.options
    }

    pub(crate) fn scanner(&self) -> TreeScanner {
        TreeScanner::new(self.options.ignore.clone()).parallel(self.options.parallel_hash)
    }

    /// Snapshot the working tree as a child of `parent`
    ///
    /// Only Added and Changed files are copied into the new version's
    /// payload store; unchanged files get a `no_changes` pointer instead.
    ///
    /// When `parent` is given but has no meta.json, the tree is diffed as if
    /// it had no parent (every file is Added) while `parent` is still
    /// recorded. A parent whose meta.json is unparsable is an error, and so
    /// is a second root: `v1-1` is only ever created once.
    pub fn create(
        &self,
        parent: Option<VersionId>,
        summary: &str,
        chat: Value,
    ) -> Result<VersionId> {
        let start = Instant::now();
        let archive_dir = self.layout.archive_dir();
        fs::create_dir_all(archive_dir).with_path(archive_dir)?;

        // 1. Resolve parent
        let parent_meta = match parent {
            Some(parent_id) => {
                let meta = VersionMeta::try_load(&self.layout, &parent_id)?;
                if meta.is_none() {
                    tracing::warn!(
                        parent = %parent_id,
                        "parent version has no meta.json; diffing as a root version"
                    );
                }
                meta
            }
            None => None,
        };

        // 2. Allocate id; a recorded version is never rewritten
        let existing = self.layout.version_dir_names()?;
        let version = VersionId::allocate(existing.iter().map(String::as_str), parent.as_ref())?;
        if self.layout.meta_path(&version.to_string()).is_file() {
            return Err(SnapError::AlreadyExists(version.to_string()));
        }

        // 3. Scan and diff
        let current = self.scanner().scan(self.root())?;
        let diff = TreeDiff::compute(parent_meta.as_ref(), &current);

        tracing::debug!(
            added = diff.added.len(),
            changed = diff.changed.len(),
            deleted = diff.deleted.len(),
            unchanged = diff.unchanged.len(),
            "diffed working tree against parent"
        );

        let version_name = version.to_string();

        // 4. Copy Added and Changed files into the payload store
        let payload_dir = self.layout.payload_dir(&version_name);
        fs::create_dir_all(&payload_dir).with_path(&payload_dir)?;

        let mut bytes_copied = 0u64;
        for rel in diff.to_copy() {
            let src = join_relative(self.root(), rel);
            let dst = self.layout.payload_path(&version_name, rel);
            bytes_copied += copy_preserving(&src, &dst)?;
        }

        // 5-6. Meta is the durable commit point; the change log follows it
        let changes = diff.change_entries();
        let meta = VersionMeta {
            version,
            parent,
            timestamp: timestamp::now(),
            summary: summary.to_string(),
            chat: if chat.is_null() {
                Value::Object(Default::default())
            } else {
                chat
            },
            changes,
            no_changes: diff.unchanged,
            file_index: current,
        };
        meta.write(&self.layout)?;

        self.append_change_log(&meta)?;

        tracing::info!(
            version = %version,
            parent = ?parent.map(|p| p.to_string()),
            changes = meta.changes.len(),
            unchanged = meta.no_changes.len(),
            bytes_copied,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "created version"
        );

        Ok(version)
    }

    fn append_change_log(&self, meta: &VersionMeta) -> Result<()> {
        let mut log = match ChangeLog::load(&self.layout) {
            Ok(log) => log,
            Err(e) if e.kind() == ErrorKind::CorruptMeta => {
                tracing::warn!(error = %e, "change log unreadable; rebuilding from version metas");
                let mut metas = self.metas()?;
                metas.retain(|m| m.version != meta.version);
                ChangeLog::rebuild(&metas)
            }
            Err(e) => return Err(e),
        };

        log.append(ChangeLogEntry::from_meta(meta), self.options.mark_current);
        log.save(&self.layout)
    }

    /// Every recognized version (directory with a meta.json), ordered by generation then index
    pub fn list(&self) -> Result<Vec<VersionId>> {
        let mut versions: Vec<VersionId> = self
            .layout
            .version_dir_names()?
            .iter()
            .filter_map(|name| name.parse::<VersionId>().ok())
            .filter(|id| self.layout.meta_path(&id.to_string()).is_file())
            .collect();
        versions.sort();
        Ok(versions)
    }

    pub fn load_meta(&self, version: &VersionId) -> Result<VersionMeta> {
        VersionMeta::load(&self.layout, version)
    }

    /// Metas of every listed version; unparsable ones are skipped with a warning
    pub fn metas(&self) -> Result<Vec<VersionMeta>> {
        let mut metas = Vec::new();
        for version in self.list()? {
            match self.load_meta(&version) {
                Ok(meta) => metas.push(meta),
                Err(e) if e.kind() == ErrorKind::CorruptMeta => {
                    tracing::warn!(version = %version, error = %e, "skipping corrupt version");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(metas)
    }

    pub fn change_log(&self) -> Result<ChangeLog> {
        ChangeLog::load(&self.layout)
    }

    /// Reconstruct the working tree as it was at `version`
    pub fn restore(&self, version: &VersionId, overwrite: bool) -> Result<RestoreReport> {
        RestoreEngine::new(self).restore(version, overwrite)
    }
}
