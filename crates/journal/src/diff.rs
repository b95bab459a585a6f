//! Classification of the current tree against a parent version

use crate::meta::{ChangeEntry, ChangeKind, NoChangeEntry, VersionMeta};
use std::collections::HashMap;
use treesnap_core::FileIndex;

/// Differences between a parent version and the current scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeDiff {
    /// In current, absent from parent
    pub added: Vec<String>,
    /// In both, different hash
    pub changed: Vec<String>,
    /// In parent, absent from current
    pub deleted: Vec<String>,
    /// In both, same hash, with the version that holds the bytes
    pub unchanged: Vec<NoChangeEntry>,
}

impl TreeDiff {
    /// Compute the diff of `current` against `parent` (`None` for a root version)
    ///
    /// An unchanged file inherits the parent's own `no_changes` pointer when
    /// there is one; otherwise the parent introduced or changed it and is the
    /// holder itself. Either way the pointer names a version whose payload
    /// store has the bytes, in one hop.
    pub fn compute(parent: Option<&VersionMeta>, current: &FileIndex) -> Self {
        let Some(parent) = parent else {
            return Self {
                added: current.keys().cloned().collect(),
                ..Self::default()
            };
        };

        let inherited: HashMap<&str, _> = parent
            .no_changes
            .iter()
            .map(|entry| (entry.path.as_str(), entry.last_version))
            .collect();

        let mut diff = Self::default();

        for (path, record) in current {
            match parent.file_index.get(path) {
                None => diff.added.push(path.clone()),
                Some(old) if old.hash != record.hash => diff.changed.push(path.clone()),
                Some(_) => {
                    let last_version = inherited
                        .get(path.as_str())
                        .copied()
                        .unwrap_or(parent.version);
                    diff.unchanged.push(NoChangeEntry::new(path, last_version));
                }
            }
        }

        diff.deleted = parent
            .file_index
            .keys()
            .filter(|path| !current.contains_key(*path))
            .cloned()
            .collect();

        diff
    }

    /// Paths whose bytes go into the new version's payload store
    pub fn to_copy(&self) -> impl Iterator<Item = &String> {
        self.added.iter().chain(self.changed.iter())
    }

    /// The `changes` list: Added, then Changed, then Deleted
    pub fn change_entries(&self) -> Vec<ChangeEntry> {
        let tagged = |paths: &[String], kind| {
            paths
                .iter()
                .map(move |p| ChangeEntry::new(p, kind))
                .collect::<Vec<_>>()
        };

        let mut entries = tagged(self.added.as_slice(), ChangeKind::Add);
        entries.extend(tagged(self.changed.as_slice(), ChangeKind::Change));
        entries.extend(tagged(self.deleted.as_slice(), ChangeKind::Delete));
        entries
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.deleted.is_empty()
    }
}
