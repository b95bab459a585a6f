//! Error taxonomy shared by every treesnap crate

use std::io;
use std::path::{Path, PathBuf};

/// Flat classification of a [`SnapError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Requested version (or its meta.json) does not exist
    NotFound,
    /// meta.json is present but cannot be parsed
    CorruptMeta,
    /// The version being written is already recorded
    AlreadyExists,
    /// Permission or disk failure during scan, copy or write
    Io,
    /// A version id, glob pattern or relative path was malformed
    Invalid,
}

/// Errors returned by archive operations
#[derive(Debug, thiserror::Error)]
pub enum SnapError {
    #[error("version not found: {0}")]
    NotFound(String),

    #[error("version already exists: {0}")]
    AlreadyExists(String),

    #[error("corrupt meta.json for version {version}: {reason}")]
    CorruptMeta { version: String, reason: String },

    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid version id: {0:?} (expected v<generation>-<index>)")]
    InvalidVersionId(String),

    #[error("invalid ignore pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid relative path {0:?}")]
    InvalidPath(String),
}

impl SnapError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        SnapError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn corrupt_meta(version: impl Into<String>, reason: impl ToString) -> Self {
        SnapError::CorruptMeta {
            version: version.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SnapError::NotFound(_) => ErrorKind::NotFound,
            SnapError::CorruptMeta { .. } => ErrorKind::CorruptMeta,
            SnapError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            SnapError::Io { .. } => ErrorKind::Io,
            SnapError::InvalidVersionId(_)
            | SnapError::InvalidPattern { .. }
            | SnapError::InvalidPath(_) => ErrorKind::Invalid,
        }
    }
}

/// Attach a path to `std::io::Result` values
pub trait IoResultExt<T> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T, SnapError>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T, SnapError> {
        self.map_err(|e| SnapError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(SnapError::NotFound("v1-1".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            SnapError::corrupt_meta("v2-1", "eof").kind(),
            ErrorKind::CorruptMeta
        );
        assert_eq!(
            SnapError::io("a.txt", io::Error::from(io::ErrorKind::PermissionDenied)).kind(),
            ErrorKind::Io
        );
        assert_eq!(SnapError::InvalidVersionId("x".into()).kind(), ErrorKind::Invalid);
        assert_eq!(
            SnapError::AlreadyExists("v1-1".into()).kind(),
            ErrorKind::AlreadyExists
        );
    }

    #[test]
    fn test_io_error_mentions_path() {
        let err: Result<(), SnapError> =
            Err(io::Error::from(io::ErrorKind::NotFound)).with_path("assets/hero.png");
        let msg = err.unwrap_err().to_string();
        assert!(msg.contains("assets/hero.png"));
    }
}
