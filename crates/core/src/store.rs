//! On-disk archive layout and crash-safe write helpers

use crate::error::{IoResultExt, SnapError};
use crate::Result;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Directory name of the archive, directly beneath the working tree root
pub const ARCHIVE_DIRNAME: &str = "archive";
pub const META_FILENAME: &str = "meta.json";
pub const PAYLOAD_DIRNAME: &str = "files";
pub const CHANGE_LOG_FILENAME: &str = "change_log.json";
pub const LOCK_FILENAME: &str = ".lock";

/// Paths of the archive that lives under a working tree
///
/// ```text
/// <root>/
///   archive/
///     change_log.json
///     .lock
///     v1-1/
///       meta.json
///       files/<relative path...>
///     v2-1/
///       ...
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    root: PathBuf,
    archive_dir: PathBuf,
}

impl ArchiveLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let archive_dir = root.join(ARCHIVE_DIRNAME);
        Self { root, archive_dir }
    }

    /// Working tree root
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.archive_dir.join(version)
    }

    pub fn meta_path(&self, version: &str) -> PathBuf {
        self.version_dir(version).join(META_FILENAME)
    }

    /// Private payload store of a version (Added/Changed files only)
    pub fn payload_dir(&self, version: &str) -> PathBuf {
        self.version_dir(version).join(PAYLOAD_DIRNAME)
    }

    /// Location of `rel_path` inside a version's payload store
    pub fn payload_path(&self, version: &str, rel_path: &str) -> PathBuf {
        join_relative(&self.payload_dir(version), rel_path)
    }

    pub fn change_log_path(&self) -> PathBuf {
        self.archive_dir.join(CHANGE_LOG_FILENAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.archive_dir.join(LOCK_FILENAME)
    }

    /// Names of every directory directly beneath the archive
    ///
    /// Returns an empty list when the archive does not exist yet.
    pub fn version_dir_names(&self) -> Result<Vec<String>> {
        if !self.archive_dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.archive_dir).with_path(&self.archive_dir)? {
            let entry = entry.with_path(&self.archive_dir)?;
            let file_type = entry.file_type().with_path(entry.path())?;
            if file_type.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }
}

/// Join a `/`-separated relative path onto a base directory
///
/// Paths read back from a meta.json are checked with [`is_safe_relative`]
/// first, so the result never leaves `base`.
pub fn join_relative(base: &Path, rel_path: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    for part in rel_path.split('/').filter(|p| !p.is_empty()) {
        path.push(part);
    }
    path
}

/// True for a normalized relative path: no empty, `.` or `..` segments
pub fn is_safe_relative(rel_path: &str) -> bool {
    !rel_path.is_empty()
        && rel_path
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..")
}

/// Atomic write helper
///
/// Writes data to a uuid-named sibling of `target`, fsyncs it, then renames
/// it over the target so readers never observe a partial file.
pub fn atomic_write(target: &Path, data: &[u8]) -> Result<()> {
    let parent = target
        .parent()
        .ok_or_else(|| SnapError::InvalidPath(target.display().to_string()))?;
    fs::create_dir_all(parent).with_path(parent)?;

    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let write_result = (|| -> std::io::Result<()> {
        let mut temp_file = fs::File::create(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()?;
        Ok(())
    })();

    if let Err(e) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(SnapError::io(&temp_path, e));
    }

    if let Err(e) = fs::rename(&temp_path, target) {
        let _ = fs::remove_file(&temp_path);
        return Err(SnapError::io(target, e));
    }

    // Fsync parent directory for durability
    if let Ok(dir) = fs::File::open(parent) {
        let _ = dir.sync_all();
    }

    Ok(())
}

/// Copy a file, creating parent directories and carrying over its mtime
pub fn copy_preserving(src: &Path, dst: &Path) -> Result<u64> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).with_path(parent)?;
    }

    let metadata = fs::metadata(src).with_path(src)?;
    let modified = metadata.modified().with_path(src)?;

    let mut reader = fs::File::open(src).with_path(src)?;
    let mut writer = fs::File::create(dst).with_path(dst)?;
    let bytes = std::io::copy(&mut reader, &mut writer).with_path(dst)?;

    // mtime first: permissions may make the copy read-only
    writer.set_modified(modified).with_path(dst)?;
    drop(writer);
    fs::set_permissions(dst, metadata.permissions()).with_path(dst)?;

    Ok(bytes)
}

/// Normalize a relative path for storage
///
/// - Uses `/` as separator
/// - Rejects `..`, absolute and non-UTF-8 paths
/// - Removes `./` components
pub fn normalize_path(path: &Path) -> Result<String> {
    let mut parts: Vec<String> = Vec::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| SnapError::InvalidPath(path.display().to_string()))?;
                parts.push(part.to_string());
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(SnapError::InvalidPath(path.display().to_string()));
            }
        }
    }

    if parts.is_empty() {
        return Err(SnapError::InvalidPath(path.display().to_string()));
    }

    Ok(parts.join("/"))
}
