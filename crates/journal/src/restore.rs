//! Reconstruction of the working tree from a version
//!
//! Restore runs in three phases:
//! 1. drift removal: tracked files absent from the target are deleted
//! 2. staging: every file of the target is resolved and copied into a
//!    scratch directory under `archive/`
//! 3. apply: staged files are copied over the working tree
//!
//! Files the target cannot supply are reported as warnings; restore still
//! completes with whatever it could stage.

use crate::archive::Archive;
use crate::meta::VersionMeta;
use crate::version::VersionId;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Instant;
use treesnap_core::store::{copy_preserving, join_relative};
use treesnap_core::{FileRecord, IoResultExt, Result, SnapError};

/// Non-fatal problems met while restoring
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreWarning {
    /// Neither the target's store nor its `no_changes` pointer held the file
    MissingPayload {
        path: String,
        looked_in: Vec<VersionId>,
    },
    /// An ancestor named by a pointer has an unreadable meta.json
    CorruptAncestor { version: VersionId, reason: String },
    /// The ancestor's own index disagrees with the target about a file's content
    HashMismatch { path: String, holder: VersionId },
    /// The file already existed and overwrite was off
    KeptExisting { path: String },
}

impl fmt::Display for RestoreWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestoreWarning::MissingPayload { path, looked_in } => {
                let versions: Vec<String> = looked_in.iter().map(ToString::to_string).collect();
                write!(f, "{}: payload not found (looked in {})", path, versions.join(", "))
            }
            RestoreWarning::CorruptAncestor { version, reason } => {
                write!(f, "{}: ancestor meta.json unreadable: {}", version, reason)
            }
            RestoreWarning::HashMismatch { path, holder } => {
                write!(f, "{}: content recorded in {} differs from target", path, holder)
            }
            RestoreWarning::KeptExisting { path } => {
                write!(f, "{}: kept existing file", path)
            }
        }
    }
}

/// What a restore did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreReport {
    pub version: Option<VersionId>,
    /// Files written into the working tree
    pub restored: Vec<String>,
    /// Tracked files removed because the target does not have them
    pub deleted: Vec<String>,
    pub warnings: Vec<RestoreWarning>,
}

impl RestoreReport {
    /// True when no tracked file is missing its payload
    pub fn success(&self) -> bool {
        !self
            .warnings
            .iter()
            .any(|w| matches!(w, RestoreWarning::MissingPayload { .. }))
    }

    pub fn missing(&self) -> impl Iterator<Item = &str> {
        self.warnings.iter().filter_map(|w| match w {
            RestoreWarning::MissingPayload { path, .. } => Some(path.as_str()),
            _ => None,
        })
    }
}

/// Ancestor metas loaded while following `no_changes` pointers
enum AncestorState {
    Loaded(Box<VersionMeta>),
    Unreadable,
}

pub struct RestoreEngine<'a> {
    archive: &'a Archive,
    ancestors: HashMap<VersionId, AncestorState>,
}

impl<'a> RestoreEngine<'a> {
    pub fn new(archive: &'a Archive) -> Self {
        Self {
            archive,
            ancestors: HashMap::new(),
        }
    }

    /// Restore the working tree to `version`
    ///
    /// Fails with `NotFound` or `CorruptMeta` before touching anything when
    /// the target itself cannot be loaded.
    pub fn restore(mut self, version: &VersionId, overwrite: bool) -> Result<RestoreReport> {
        let start = Instant::now();
        let archive = self.archive;
        let layout = archive.layout();
        let root = archive.root();

        let target = VersionMeta::load(layout, version)?;
        let mut report = RestoreReport {
            version: Some(*version),
            ..RestoreReport::default()
        };

        // 1. Drift removal
        let current = archive.scanner().scan(root)?;
        for rel in current.keys() {
            if target.file_index.contains_key(rel) {
                continue;
            }
            let path = join_relative(root, rel);
            fs::remove_file(&path).with_path(&path)?;
            tracing::debug!(path = %rel, "removed file absent from target");
            report.deleted.push(rel.clone());
        }

        // 2. Staging
        let staging = tempfile::Builder::new()
            .prefix(".restore-")
            .tempdir_in(layout.archive_dir())
            .with_path(layout.archive_dir())?;

        let pointers: HashMap<&str, VersionId> = target
            .no_changes
            .iter()
            .map(|entry| (entry.path.as_str(), entry.last_version))
            .collect();

        let mut staged = Vec::with_capacity(target.file_index.len());
        let version_name = version.to_string();

        for (rel, record) in &target.file_index {
            let own = layout.payload_path(&version_name, rel);
            let source = if own.is_file() {
                Some(own)
            } else if let Some(holder) = pointers.get(rel.as_str()) {
                let candidate = layout.payload_path(&holder.to_string(), rel);
                if candidate.is_file() {
                    self.check_ancestor(holder, rel, record, &mut report);
                    Some(candidate)
                } else {
                    None
                }
            } else {
                None
            };

            let Some(source) = source else {
                let mut looked_in = vec![*version];
                looked_in.extend(pointers.get(rel.as_str()).copied());
                tracing::warn!(path = %rel, "no payload holds this file; skipping");
                report.warnings.push(RestoreWarning::MissingPayload {
                    path: rel.clone(),
                    looked_in,
                });
                continue;
            };

            copy_preserving(&source, &join_relative(staging.path(), rel))?;
            staged.push(rel.as_str());
        }

        // 3. Apply
        let ignore = &archive.options().ignore;
        for rel in staged {
            if ignore.is_ignored(rel) {
                continue;
            }

            let dst = join_relative(root, rel);
            if exists(&dst).with_path(&dst)? {
                if !overwrite {
                    report.warnings.push(RestoreWarning::KeptExisting {
                        path: rel.to_string(),
                    });
                    continue;
                }
                fs::remove_file(&dst).with_path(&dst)?;
            }

            copy_preserving(&join_relative(staging.path(), rel), &dst)?;
            report.restored.push(rel.to_string());
        }

        let staging_path = staging.path().to_path_buf();
        if let Err(e) = staging.close() {
            tracing::warn!(path = %staging_path.display(), error = %e, "failed to remove staging directory");
        }

        tracing::info!(
            version = %version,
            restored = report.restored.len(),
            deleted = report.deleted.len(),
            warnings = report.warnings.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "restored version"
        );

        Ok(report)
    }

    /// Cross-check a pointer target against the holder's own file index
    fn check_ancestor(
        &mut self,
        holder: &VersionId,
        rel: &str,
        record: &FileRecord,
        report: &mut RestoreReport,
    ) {
        let layout = self.archive.layout();
        let ancestors = &mut self.ancestors;
        let state = ancestors.entry(*holder).or_insert_with(|| {
            let reason = match VersionMeta::try_load(layout, holder) {
                Ok(Some(meta)) => return AncestorState::Loaded(Box::new(meta)),
                Ok(None) => "meta.json missing".to_string(),
                Err(SnapError::CorruptMeta { reason, .. }) => reason,
                Err(e) => e.to_string(),
            };
            tracing::warn!(version = %holder, reason = %reason, "ancestor meta unreadable");
            report.warnings.push(RestoreWarning::CorruptAncestor {
                version: *holder,
                reason,
            });
            AncestorState::Unreadable
        });

        if let AncestorState::Loaded(meta) = state {
            let agrees = meta
                .file_index
                .get(rel)
                .map_or(false, |held| held.hash == record.hash);
            if !agrees {
                tracing::warn!(path = %rel, holder = %holder, "ancestor index disagrees with target");
                report.warnings.push(RestoreWarning::HashMismatch {
                    path: rel.to_string(),
                    holder: *holder,
                });
            }
        }
    }
}

fn exists(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn write(root: &Path, rel: &str, data: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    fn read(root: &Path, rel: &str) -> String {
        fs::read_to_string(root.join(rel)).unwrap()
    }

    #[test]
    fn test_restore_unknown_version_is_not_found() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let archive = Archive::open(temp_dir.path());

        let err = archive.restore(&"v9-9".parse()?, true).unwrap_err();
        assert_eq!(err.kind(), treesnap_core::ErrorKind::NotFound);
        Ok(())
    }

    #[test]
    fn test_restore_follows_pointer_and_deletes_drift() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path();
        let archive = Archive::open(root);

        write(root, "main.ts", "v1");
        write(root, "lib/util.ts", "util");
        let v1 = archive.create(None, "", Value::Null)?;

        write(root, "main.ts", "v2");
        let v2 = archive.create(Some(v1), "", Value::Null)?;

        write(root, "main.ts", "drift");
        write(root, "scratch.ts", "tmp");
        write(root, "index.html", "<html>");

        let report = archive.restore(&v2, true)?;

        assert!(report.success());
        assert_eq!(report.deleted, vec!["scratch.ts"]);
        assert_eq!(read(root, "main.ts"), "v2");
        assert_eq!(read(root, "lib/util.ts"), "util");
        assert!(!root.join("scratch.ts").exists());
        // Ignored files are neither deleted nor overwritten
        assert_eq!(read(root, "index.html"), "<html>");
        Ok(())
    }

    #[test]
    fn test_restore_without_overwrite_keeps_existing() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path();
        let archive = Archive::open(root);

        write(root, "a.txt", "old");
        let v1 = archive.create(None, "", Value::Null)?;
        write(root, "a.txt", "new");

        let report = archive.restore(&v1, false)?;

        assert_eq!(read(root, "a.txt"), "new");
        assert_eq!(
            report.warnings,
            vec![RestoreWarning::KeptExisting {
                path: "a.txt".to_string()
            }]
        );
        Ok(())
    }

    #[test]
    fn test_missing_payload_is_reported_not_fatal() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path();
        let archive = Archive::open(root);

        write(root, "a.txt", "a");
        write(root, "b.txt", "b");
        let v1 = archive.create(None, "", Value::Null)?;
        fs::remove_file(archive.layout().payload_path("v1-1", "a.txt"))?;
        fs::remove_file(root.join("a.txt"))?;

        let report = archive.restore(&v1, true)?;

        assert!(!report.success());
        assert_eq!(report.missing().collect::<Vec<_>>(), vec!["a.txt"]);
        assert_eq!(read(root, "b.txt"), "b");
        assert!(!root.join("a.txt").exists());
        Ok(())
    }

    #[test]
    fn test_corrupt_ancestor_is_a_warning() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path();
        let archive = Archive::open(root);

        write(root, "keep.txt", "kept");
        let v1 = archive.create(None, "", Value::Null)?;
        let v2 = archive.create(Some(v1), "", Value::Null)?;
        fs::write(archive.layout().meta_path("v1-1"), b"not json")?;
        fs::remove_file(root.join("keep.txt"))?;

        let report = archive.restore(&v2, true)?;

        assert_eq!(read(root, "keep.txt"), "kept");
        assert!(report.success());
        assert!(matches!(
            report.warnings.as_slice(),
            [RestoreWarning::CorruptAncestor { version, .. }] if *version == v1
        ));
        Ok(())
    }

    #[test]
    fn test_corrupt_target_fails_before_touching_tree() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path();
        let archive = Archive::open(root);

        write(root, "a.txt", "a");
        let v1 = archive.create(None, "", Value::Null)?;
        fs::write(archive.layout().meta_path("v1-1"), b"{ truncated")?;
        write(root, "a.txt", "edited");
        write(root, "extra.txt", "drift");

        let err = archive.restore(&v1, true).unwrap_err();

        assert_eq!(err.kind(), treesnap_core::ErrorKind::CorruptMeta);
        assert_eq!(read(root, "a.txt"), "edited");
        assert_eq!(read(root, "extra.txt"), "drift");
        Ok(())
    }

    #[test]
    fn test_hash_mismatch_is_a_warning() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path();
        let archive = Archive::open(root);

        write(root, "a.txt", "hello");
        let v1 = archive.create(None, "", Value::Null)?;
        let v2 = archive.create(Some(v1), "", Value::Null)?;

        // Holder's index now disagrees with what v2 recorded
        let mut holder = VersionMeta::load(archive.layout(), &v1)?;
        let record = holder.file_index.get_mut("a.txt").unwrap();
        record.hash = treesnap_core::hash::hash_bytes(b"something else");
        holder.write(archive.layout())?;
        fs::remove_file(root.join("a.txt"))?;

        let report = archive.restore(&v2, true)?;

        assert!(report.success());
        assert_eq!(read(root, "a.txt"), "hello");
        assert_eq!(
            report.warnings,
            vec![RestoreWarning::HashMismatch {
                path: "a.txt".to_string(),
                holder: v1
            }]
        );
        Ok(())
    }

    #[test]
    fn test_staging_directory_is_removed() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path();
        let archive = Archive::open(root);
        write(root, "a.txt", "a");
        let v1 = archive.create(None, "", Value::Null)?;

        archive.restore(&v1, true)?;

        let leftovers: Vec<_> = fs::read_dir(archive.layout().archive_dir())?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".restore-"))
            .collect();
        assert!(leftovers.is_empty());
        Ok(())
    }
}
