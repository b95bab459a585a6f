//! Treesnap Core - scanning and storage primitives for treesnap archives
//!
//! This crate provides the foundational layer:
//! - SHA-256 content fingerprints
//! - Glob ignore rules
//! - Working tree scanning
//! - Archive layout and atomic writes

pub mod error;
pub mod hash;
pub mod ignore;
pub mod scan;
pub mod store;

// Re-export main types for convenience
pub use error::{ErrorKind, IoResultExt, SnapError};
pub use hash::Sha256Hash;
pub use ignore::{IgnoreSet, DEFAULT_IGNORE};
pub use scan::{FileIndex, FileRecord, TreeScanner};
pub use store::ArchiveLayout;

/// Common result type used throughout treesnap
pub type Result<T> = std::result::Result<T, SnapError>;
