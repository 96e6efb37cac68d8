//! Path normalization and directory exclusion.
//!
//! Exclusion entries are compared against directory paths after both sides
//! went through the same normalization:
//!
//! 1. Relative entries are joined onto the search root.
//! 2. `.` components are dropped and `..` pops the previous component
//!    (purely lexical, the filesystem is never consulted).
//! 3. For comparison only, the result is converted to Unicode NFC, since
//!    macOS reports NFD names while users type NFC.
//!
//! # Example
//!
//! ```
//! use rustlink::scanner::path_utils::{normalize_lexically, ExclusionSet};
//! use std::path::{Path, PathBuf};
//!
//! assert_eq!(
//!     normalize_lexically(Path::new("/srv/docs/./a/../_site")),
//!     PathBuf::from("/srv/docs/_site")
//! );
//!
//! let set = ExclusionSet::new(Path::new("/srv/docs"), &[".git".to_string()], false);
//! assert!(set.is_excluded(Path::new("/srv/docs/.git")));
//! assert!(!set.is_excluded(Path::new("/srv/docs/book/.git")));
//! ```

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

/// Normalize a path lexically.
///
/// The result still names the same directory entry on disk, so it is safe to
/// use for opening files.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root or a prefix
                let poppable = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if poppable {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }

    out
}

/// Normalize a path lexically and convert it to NFC for comparisons.
///
/// Paths that are not valid UTF-8 keep their bytes.
#[must_use]
pub fn comparison_key(path: &Path) -> PathBuf {
    let lexical = normalize_lexically(path);
    match lexical.to_str() {
        Some(s) => PathBuf::from(s.nfc().collect::<String>()),
        None => lexical,
    }
}

/// Express `path` relative to `base` for display.
///
/// Falls back to the full path when it is not under `base`.
#[must_use]
pub fn display_relative(path: &Path, base: &Path) -> String {
    match path.strip_prefix(base) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.display().to_string(),
        _ => path.display().to_string(),
    }
}

/// Set of directories that the scanner must never descend into.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    /// Normalized absolute paths
    paths: HashSet<PathBuf>,
    /// Basenames, consulted only when `nested` is set
    names: HashSet<OsString>,
    /// Prune matching basenames at any depth, not only directly under the root
    nested: bool,
}

impl ExclusionSet {
    /// Build the set for a search root.
    ///
    /// Each entry is resolved against `root` (absolute entries are kept as is).
    #[must_use]
    pub fn new(root: &Path, entries: &[String], nested: bool) -> Self {
        let mut paths = HashSet::with_capacity(entries.len());
        let mut names = HashSet::new();

        for entry in entries {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            paths.insert(comparison_key(&root.join(entry)));

            if nested {
                if let Some(name) = Path::new(entry).file_name() {
                    names.insert(normalize_name(name));
                }
            }
        }

        Self {
            paths,
            names,
            nested,
        }
    }

    /// Check whether a directory path is excluded.
    #[must_use]
    pub fn is_excluded(&self, dir: &Path) -> bool {
        if self.is_empty() {
            return false;
        }
        if self.paths.contains(&comparison_key(dir)) {
            return true;
        }
        self.nested
            && dir
                .file_name()
                .is_some_and(|name| self.names.contains(&normalize_name(name)))
    }

    /// Number of configured entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if nothing is excluded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn normalize_name(name: &std::ffi::OsStr) -> OsString {
    match name.to_str() {
        Some(s) => OsString::from(s.nfc().collect::<String>()),
        None => name.to_os_string(),
    }
}
