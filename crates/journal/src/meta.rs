//! `meta.json`: the immutable descriptor written once per version

use crate::version::VersionId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io;
use treesnap_core::store::{atomic_write, is_safe_relative, ArchiveLayout};
use treesnap_core::{FileIndex, IoResultExt, Result, SnapError};

/// How a path differs from the parent version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Add,
    Change,
    Delete,
}

/// One entry of `changes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Final path component
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
}

impl ChangeEntry {
    pub fn new(path: &str, kind: ChangeKind) -> Self {
        Self {
            name: file_name_of(path).to_string(),
            path: path.to_string(),
            kind,
        }
    }
}

/// One entry of `no_changes`: an unchanged file and the version whose
/// payload store physically holds its bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoChangeEntry {
    pub name: String,
    pub path: String,
    pub last_version: VersionId,
}

impl NoChangeEntry {
    pub fn new(path: &str, last_version: VersionId) -> Self {
        Self {
            name: file_name_of(path).to_string(),
            path: path.to_string(),
            last_version,
        }
    }
}

fn file_name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

/// Metadata of one version, serialized as `archive/<version>/meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMeta {
    pub version: VersionId,
    pub parent: Option<VersionId>,
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub summary: String,
    /// Opaque conversation payload, passed through untouched
    #[serde(default = "empty_object")]
    pub chat: Value,
    #[serde(default)]
    pub changes: Vec<ChangeEntry>,
    #[serde(default)]
    pub no_changes: Vec<NoChangeEntry>,
    /// Every tracked file at creation time, including ones not in this
    /// version's payload store
    #[serde(default)]
    pub file_index: FileIndex,
}

impl VersionMeta {
    /// Load a version's meta
    ///
    /// Missing directory or meta.json is `NotFound`; unparsable JSON is `CorruptMeta`.
    pub fn load(layout: &ArchiveLayout, version: &VersionId) -> Result<Self> {
        Self::try_load(layout, version)?.ok_or_else(|| SnapError::NotFound(version.to_string()))
    }

    /// Like [`VersionMeta::load`], but a missing meta.json is `Ok(None)`
    pub fn try_load(layout: &ArchiveLayout, version: &VersionId) -> Result<Option<Self>> {
        let path = layout.meta_path(&version.to_string());
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SnapError::io(&path, e)),
        };

        let meta: VersionMeta = serde_json::from_slice(&bytes)
            .map_err(|e| SnapError::corrupt_meta(version.to_string(), e))?;

        // Every path is later joined onto the working tree
        let paths = meta
            .file_index
            .keys()
            .chain(meta.changes.iter().map(|c| &c.path))
            .chain(meta.no_changes.iter().map(|n| &n.path));
        for path in paths {
            if !is_safe_relative(path) {
                return Err(SnapError::corrupt_meta(
                    version.to_string(),
                    format!("unsafe relative path {:?}", path),
                ));
            }
        }

        Ok(Some(meta))
    }

    /// Write meta.json atomically
    pub fn write(&self, layout: &ArchiveLayout) -> Result<()> {
        let path = layout.meta_path(&self.version.to_string());
        let bytes = to_pretty_json(self).with_path(&path)?;
        atomic_write(&path, &bytes)
    }

    /// The `no_changes` pointer recorded for `path`, if any
    pub fn last_version_of(&self, path: &str) -> Option<VersionId> {
        self.no_changes
            .iter()
            .find(|entry| entry.path == path)
            .map(|entry| entry.last_version)
    }

    pub fn changes_of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &ChangeEntry> {
        self.changes.iter().filter(move |c| c.kind == kind)
    }
}

/// Serialize with 4-space indentation and raw UTF-8
pub(crate) fn to_pretty_json<T: Serialize>(value: &T) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer).map_err(io::Error::from)?;
    Ok(out)
}

/// Naive local ISO-8601 timestamps with microsecond precision
pub(crate) mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

    pub fn now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<NaiveDateTime>().map_err(serde::de::Error::custom)
    }
}
