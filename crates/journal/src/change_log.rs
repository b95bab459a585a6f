//! `change_log.json`: append-only index over every version

use crate::meta::{timestamp, to_pretty_json, VersionMeta};
use crate::version::VersionId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use treesnap_core::store::{atomic_write, ArchiveLayout, CHANGE_LOG_FILENAME};
use treesnap_core::{IoResultExt, Result, SnapError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub version: VersionId,
    pub parent: Option<VersionId>,
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub is_latest: bool,
    #[serde(default)]
    pub is_current: bool,
}

impl ChangeLogEntry {
    pub fn from_meta(meta: &VersionMeta) -> Self {
        Self {
            version: meta.version,
            parent: meta.parent,
            timestamp: meta.timestamp,
            summary: meta.summary.clone(),
            is_latest: false,
            is_current: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeLog {
    #[serde(default)]
    versions: Vec<ChangeLogEntry>,
}

impl ChangeLog {
    /// Load the change log; a missing file is an empty log
    pub fn load(layout: &ArchiveLayout) -> Result<Self> {
        let path = layout.change_log_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(SnapError::io(&path, e)),
        };

        serde_json::from_slice(&bytes).map_err(|e| SnapError::corrupt_meta(CHANGE_LOG_FILENAME, e))
    }

    /// Rebuild a log from version metas, oldest first; the newest is latest and current
    pub fn rebuild(metas: &[VersionMeta]) -> Self {
        let mut versions: Vec<ChangeLogEntry> = metas.iter().map(ChangeLogEntry::from_meta).collect();
        versions.sort_by(|a, b| (a.timestamp, a.version).cmp(&(b.timestamp, b.version)));

        if let Some(last) = versions.last_mut() {
            last.is_latest = true;
            last.is_current = true;
        }
        Self { versions }
    }

    /// Append an entry as the new latest version
    ///
    /// Every prior entry loses `is_latest`; when `is_current` is set they
    /// also lose `is_current`.
    pub fn append(&mut self, mut entry: ChangeLogEntry, is_current: bool) {
        for existing in &mut self.versions {
            existing.is_latest = false;
            if is_current {
                existing.is_current = false;
            }
        }

        entry.is_latest = true;
        entry.is_current = is_current;
        self.versions.push(entry);
    }

    pub fn save(&self, layout: &ArchiveLayout) -> Result<()> {
        let path = layout.change_log_path();
        let bytes = to_pretty_json(self).with_path(&path)?;
        atomic_write(&path, &bytes)
    }

    pub fn entries(&self) -> &[ChangeLogEntry] {
        &self.versions
    }

    pub fn latest(&self) -> Option<&ChangeLogEntry> {
        self.versions.iter().find(|e| e.is_latest)
    }

    pub fn current(&self) -> Option<&ChangeLogEntry> {
        self.versions.iter().rev().find(|e| e.is_current)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
