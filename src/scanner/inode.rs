//! Physical file identity for hard link detection.
//!
//! # Overview
//!
//! Two directory entries are hard links to each other when they resolve to
//! the same inode on the same device. [`InodeKey`] captures that pair from
//! file metadata so the grouping and linking layers can tell "already linked"
//! members apart from members that still need a mutation.
//!
//! # Platform Support
//!
//! - **Unix**: `(st_dev, st_ino)` from [`std::os::unix::fs::MetadataExt`]
//! - **Other**: not supported; [`InodeKey::from_metadata`] returns `None`
//!
//! # Example
//!
//! ```no_run
//! use rustlink::scanner::InodeKey;
//!
//! let a = std::fs::metadata("a/config.yml").unwrap();
//! let b = std::fs::metadata("b/config.yml").unwrap();
//!
//! let same = InodeKey::from_metadata(&a) == InodeKey::from_metadata(&b);
//! println!("already linked: {}", same);
//! ```

use std::fmt;
use std::fs::Metadata;

use serde::Serialize;

/// Device and inode pair identifying one physical file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InodeKey {
    /// Device the file lives on
    pub dev: u64,
    /// Inode number within that device
    pub ino: u64,
}

impl InodeKey {
    /// Build a key from raw device and inode numbers.
    #[must_use]
    pub const fn new(dev: u64, ino: u64) -> Self {
        Self { dev, ino }
    }

    /// Read the key from file metadata.
    ///
    /// Returns `None` on platforms without inode semantics.
    #[cfg(unix)]
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    #[must_use]
    pub fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }

    /// Whether both keys live on the same device (a hard link is possible).
    #[must_use]
    pub fn same_device(&self, other: &Self) -> bool {
        self.dev == other.dev
    }

    /// Check if inode identity is available on this platform.
    #[must_use]
    pub const fn is_supported() -> bool {
        cfg!(unix)
    }
}

impl fmt::Display for InodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ino)
    }
}

/// Number of names pointing at the file, when the platform reports it.
#[cfg(unix)]
#[must_use]
pub fn link_count(metadata: &Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.nlink())
}

#[cfg(not(unix))]
#[must_use]
pub fn link_count(_metadata: &Metadata) -> Option<u64> {
    None
}
