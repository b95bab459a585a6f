//! Working tree scanning
//!
//! Enumerates every regular file under a root, skipping the archive
//! directory and anything matched by the ignore set, and fingerprints each
//! file with a streaming SHA-256.

use crate::error::{IoResultExt, SnapError};
use crate::hash::{hash_file, Sha256Hash};
use crate::ignore::IgnoreSet;
use crate::store::{normalize_path, ARCHIVE_DIRNAME};
use crate::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

/// Fingerprint of one tracked file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub hash: Sha256Hash,
    pub size: u64,
    /// Modification time in fractional seconds since the Unix epoch
    pub mtime: f64,
}

impl FileRecord {
    /// Stat and hash a file on disk
    pub fn read(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).with_path(path)?;
        let modified = metadata.modified().with_path(path)?;
        let hash = hash_file(path)?;

        Ok(Self {
            hash,
            size: metadata.len(),
            mtime: system_time_to_secs(modified),
        })
    }
}

/// Complete snapshot descriptor: relative path -> record, sorted by path
pub type FileIndex = BTreeMap<String, FileRecord>;

fn system_time_to_secs(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

/// Scans a working tree into a [`FileIndex`]
#[derive(Debug, Clone)]
pub struct TreeScanner {
    ignore: IgnoreSet,
    parallel: bool,
}

impl TreeScanner {
    pub fn new(ignore: IgnoreSet) -> Self {
        Self {
            ignore,
            parallel: true,
        }
    }

    /// Hash files on the rayon pool (default) or on the calling thread
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn ignore(&self) -> &IgnoreSet {
        &self.ignore
    }

    /// Relative paths of every trackable file, without hashing
    ///
    /// Any traversal error aborts the scan.
    pub fn list_files(&self, root: &Path) -> Result<Vec<(String, PathBuf)>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !(e.depth() == 1 && e.file_name() == ARCHIVE_DIRNAME));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"));
                SnapError::io(path, source)
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let rel = entry
                .path()
                .strip_prefix(root)
                .map_err(|_| SnapError::InvalidPath(entry.path().display().to_string()))?;
            let rel = normalize_path(rel)?;

            if self.ignore.is_ignored(&rel) {
                continue;
            }

            files.push((rel, entry.into_path()));
        }

        Ok(files)
    }

    /// Scan and fingerprint every trackable file under `root`
    ///
    /// An unreadable or vanished file fails the whole scan.
    pub fn scan(&self, root: &Path) -> Result<FileIndex> {
        let start = Instant::now();
        let files = self.list_files(root)?;

        let read = |(rel, abs): &(String, PathBuf)| -> Result<(String, FileRecord)> {
            Ok((rel.clone(), FileRecord::read(abs)?))
        };

        let records: Vec<(String, FileRecord)> = if self.parallel {
            files.par_iter().map(read).collect::<Result<_>>()?
        } else {
            files.iter().map(read).collect::<Result<_>>()?
        };

        tracing::debug!(
            root = %root.display(),
            files = records.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "scanned working tree"
        );

        Ok(records.into_iter().collect())
    }
}

impl Default for TreeScanner {
    fn default() -> Self {
        Self::new(IgnoreSet::default())
    }
}
