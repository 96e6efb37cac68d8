//! Scanner module for name-matched file discovery and content hashing.
//!
//! This module provides functionality for:
//! - Walking a directory tree and pruning excluded subtrees before descent
//! - Matching files by exact, case-sensitive basename
//! - Streaming BLAKE3 content digests
//! - Reading physical file identity (device, inode)
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and name matching
//! - [`hasher`]: BLAKE3 file hashing (8 KiB streaming chunks)
//! - [`inode`]: Hard link identity
//! - [`path_utils`]: Lexical path normalization and the exclusion set
//!
//! # Example
//!
//! ```no_run
//! use rustlink::scanner::{Hasher, Scanner, ScannerConfig};
//! use std::path::Path;
//!
//! let config = ScannerConfig::new("config.yml").with_excluded(vec![".git".into()]);
//! let outcome = Scanner::new(Path::new("/srv/docs"), config).scan().unwrap();
//!
//! let (records, errors) = Hasher::new().fingerprint_all(&outcome.entries, 1, None);
//! println!("{} hashed, {} unreadable", records.len(), errors.len());
//! ```

pub mod hasher;
pub mod inode;
pub mod path_utils;
pub mod walker;

use std::path::PathBuf;

use serde::Serialize;

// Re-export main types
pub use hasher::{hash_to_hex, Digest, Hasher, CHUNK_SIZE};
pub use inode::InodeKey;
pub use walker::{ScanEntry, ScanOutcome, Scanner};

/// Everything the pipeline knows about one matched file.
///
/// Produced by the scanner and hasher together, never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Discovery order key assigned by the scanner
    pub seq: usize,
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes at hashing time
    pub size: u64,
    /// Physical identity at hashing time
    pub inode: InodeKey,
    /// BLAKE3 digest of the full content
    #[serde(serialize_with = "serialize_digest")]
    pub digest: Digest,
}

impl FileRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(seq: usize, path: PathBuf, size: u64, inode: InodeKey, digest: Digest) -> Self {
        Self {
            seq,
            path,
            size,
            inode,
            digest,
        }
    }

    /// Digest as a hexadecimal string.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        hash_to_hex(&self.digest)
    }
}

fn serialize_digest<S: serde::Serializer>(digest: &Digest, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&hash_to_hex(digest))
}

/// Configuration for the scanner.
#[derive(Debug, Clone, Default)]
pub struct ScannerConfig {
    /// Exact basename to match (case-sensitive)
    pub filename: String,
    /// Directory entries to prune, resolved against the search root
    pub excluded: Vec<String>,
    /// Also prune any directory whose basename is excluded, at any depth
    pub exclude_nested: bool,
}

impl ScannerConfig {
    /// Create a configuration that matches `filename` and excludes nothing.
    #[must_use]
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    /// Replace the excluded entries.
    #[must_use]
    pub fn with_excluded(mut self, excluded: Vec<String>) -> Self {
        self.excluded = excluded;
        self
    }

    /// Enable or disable pruning by basename at any depth.
    #[must_use]
    pub fn with_exclude_nested(mut self, nested: bool) -> Self {
        self.exclude_nested = nested;
        self
    }
}

/// Errors that can occur during directory scanning.
///
/// Only errors on the search root reach the caller; unreadable subtrees are
/// dropped from the results by the walker.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The search root does not exist.
    #[error("Search root not found: {0}")]
    NotFound(PathBuf),

    /// The search root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The search root cannot be listed.
    #[error("Cannot read search root {path}: {source}")]
    RootUnreadable {
        /// Path of the search root
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The target filename is not a plain basename.
    #[error("Invalid file name '{0}': expected a plain name without path separators")]
    InvalidFilename(String),
}

/// Errors that can occur while fingerprinting a matched file.
///
/// A file with a hash error never joins a content group.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The file disappeared between scanning and hashing.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The platform does not expose inode identity.
    #[error("Inode identity unavailable for {0}")]
    Unsupported(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: &std::path::Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path of the file that failed.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::Unsupported(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}
