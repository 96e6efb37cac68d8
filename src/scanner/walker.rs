//! Name-matching directory walker built on walkdir.
//!
//! # Overview
//!
//! The [`Scanner`] walks the search root depth-first, sorted by file name so
//! that the discovery order is stable for a given tree. Excluded directories
//! are rejected inside `filter_entry`, which means walkdir never opens them.
//! Every regular file whose basename equals the target name becomes a
//! [`ScanEntry`] carrying its discovery sequence number.
//!
//! Unreadable subdirectories are logged and left out of the results. Only a
//! missing or unreadable search root is reported as an error.
//!
//! # Example
//!
//! ```no_run
//! use rustlink::scanner::{Scanner, ScannerConfig};
//! use std::path::Path;
//!
//! let config = ScannerConfig::new("_metadata.yml").with_excluded(vec!["_site".into()]);
//! let outcome = Scanner::new(Path::new("."), config).scan().unwrap();
//! for entry in &outcome.entries {
//!     println!("#{} {}", entry.seq, entry.path.display());
//! }
//! ```

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::WalkDir;

use super::path_utils::{normalize_lexically, ExclusionSet};
use super::{ScanError, ScannerConfig};
use crate::progress::ProgressCallback;

/// A file that matched the target name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    /// Discovery order, starting at 0
    pub seq: usize,
    /// Absolute path to the file
    pub path: PathBuf,
}

/// Result of one scan.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Absolute, lexically normalized search root
    pub root: PathBuf,
    /// Matches in discovery order
    pub entries: Vec<ScanEntry>,
    /// Directories that could not be listed and were skipped
    pub unreadable_dirs: Vec<PathBuf>,
    /// Number of directories pruned by the exclusion set
    pub pruned_dirs: usize,
    /// Whether the walk stopped early because shutdown was requested
    pub interrupted: bool,
}

/// Directory walker that collects files with one exact name.
pub struct Scanner {
    /// Root path to walk
    root: PathBuf,
    /// Scanner configuration
    config: ScannerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress reporting
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("has_shutdown_flag", &self.shutdown_flag.is_some())
            .finish_non_exhaustive()
    }
}

impl Scanner {
    /// Create a new scanner for the given root.
    #[must_use]
    pub fn new(root: &Path, config: ScannerConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            shutdown_flag: None,
            progress: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Report matches to a progress callback.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk the tree and collect every file named exactly like the target.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the filename is not a plain basename, or if
    /// the search root is missing, not a directory, or cannot be listed.
    /// Errors below the root never fail the scan.
    pub fn scan(&self) -> Result<ScanOutcome, ScanError> {
        validate_filename(&self.config.filename)?;
        let root = self.resolve_root()?;
        let target = OsStr::new(&self.config.filename);
        let exclusions =
            ExclusionSet::new(&root, &self.config.excluded, self.config.exclude_nested);

        log::debug!(
            "Scanning {} for '{}' ({} exclusions)",
            root.display(),
            self.config.filename,
            exclusions.len()
        );

        let mut outcome = ScanOutcome {
            root: root.clone(),
            ..ScanOutcome::default()
        };
        let mut pruned = 0usize;

        if let Some(ref progress) = self.progress {
            progress.on_phase_start("scan", 0);
        }

        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let excluded = entry.depth() > 0
                    && entry.file_type().is_dir()
                    && exclusions.is_excluded(entry.path());
                if excluded {
                    log::debug!("Pruning excluded directory: {}", entry.path().display());
                    pruned += 1;
                }
                !excluded
            });

        for result in walker {
            if self.is_shutdown_requested() {
                log::debug!("Scanner: shutdown requested, stopping walk");
                outcome.interrupted = true;
                break;
            }

            match result {
                Ok(entry) => {
                    if entry.file_name() != target {
                        continue;
                    }
                    if !entry.file_type().is_file() {
                        log::debug!("Skipping non-regular match: {}", entry.path().display());
                        continue;
                    }

                    let seq = outcome.entries.len();
                    log::trace!("Match #{}: {}", seq, entry.path().display());
                    if let Some(ref progress) = self.progress {
                        progress.on_progress(seq + 1, &entry.path().to_string_lossy());
                    }
                    outcome.entries.push(ScanEntry {
                        seq,
                        path: entry.into_path(),
                    });
                }
                Err(err) => {
                    let path = err.path().map_or_else(|| root.clone(), Path::to_path_buf);
                    if err.depth() == 0 {
                        let source = err
                            .into_io_error()
                            .unwrap_or_else(|| io::Error::other("filesystem loop at root"));
                        return Err(ScanError::RootUnreadable { path, source });
                    }
                    log::warn!("Skipping unreadable directory {}: {}", path.display(), err);
                    outcome.unreadable_dirs.push(path);
                }
            }
        }

        outcome.pruned_dirs = pruned;

        if let Some(ref progress) = self.progress {
            progress.on_phase_end("scan");
        }

        log::info!(
            "Scan found {} file(s) named '{}' ({} pruned, {} unreadable)",
            outcome.entries.len(),
            self.config.filename,
            outcome.pruned_dirs,
            outcome.unreadable_dirs.len()
        );

        Ok(outcome)
    }

    /// Make the root absolute and check that it can be listed.
    fn resolve_root(&self) -> Result<PathBuf, ScanError> {
        let absolute = std::path::absolute(&self.root).map_err(|source| {
            ScanError::RootUnreadable {
                path: self.root.clone(),
                source,
            }
        })?;
        let root = normalize_lexically(&absolute);

        let metadata = fs::metadata(&root).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ScanError::NotFound(root.clone()),
            _ => ScanError::RootUnreadable {
                path: root.clone(),
                source,
            },
        })?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(root));
        }

        fs::read_dir(&root).map_err(|source| ScanError::RootUnreadable {
            path: root.clone(),
            source,
        })?;

        Ok(root)
    }
}

/// Reject names that could never be a single directory entry.
fn validate_filename(name: &str) -> Result<(), ScanError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || (cfg!(windows) && name.contains('\\'));
    if invalid {
        return Err(ScanError::InvalidFilename(name.to_string()));
    }
    Ok(())
}
