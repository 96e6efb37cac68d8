//! Crash-safe hard link creation.
//!
//! # Overview
//!
//! [`LinkExecutor::link_candidate`] makes a candidate path resolve to the
//! canonical source's inode without ever touching the source:
//!
//! 1. Re-stat the source and candidate. If the candidate already shares the
//!    source's inode there is nothing to do.
//! 2. Hard link the source under a unique temporary name in the candidate's
//!    directory (same directory, so same filesystem).
//! 3. `rename` the temporary over the candidate. The rename replaces the
//!    directory entry atomically, so the candidate name always exists.
//!
//! If step 3 fails the temporary is removed and the candidate keeps its old
//! content. Failures are reported as [`LinkError`] values naming the path and
//! the OS error; they are never retried.
//!
//! # Example
//!
//! ```no_run
//! use rustlink::actions::link::{LinkExecutor, LinkOutcome};
//! use rustlink::scanner::InodeKey;
//! use std::path::Path;
//!
//! let executor = LinkExecutor::new();
//! let outcome = executor
//!     .link_candidate(
//!         Path::new("a/config.yml"),
//!         InodeKey::new(2049, 131),
//!         42,
//!         Path::new("b/config.yml"),
//!     )
//!     .unwrap();
//! assert_eq!(outcome, LinkOutcome::Linked);
//! ```

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use thiserror::Error;

use crate::duplicates::LinkPlan;
use crate::scanner::InodeKey;

/// Per-process counter that keeps temporary names unique across threads.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Error type for link operations.
///
/// Every variant names the path it concerns.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The canonical source cannot be stat'ed.
    #[error("canonical source unavailable {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The canonical source is no longer the file that was hashed.
    #[error("canonical source changed since scan: {0}")]
    SourceChanged(PathBuf),

    /// The candidate cannot be stat'ed.
    #[error("cannot stat {path}: {source}")]
    CandidateUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The candidate is on a different device than the canonical source.
    #[error("{path} is on a different device than {canonical}")]
    CrossDevice { path: PathBuf, canonical: PathBuf },

    /// The candidate changed since it was hashed (TOCTOU protection).
    #[error("file modified since scan: {path} (expected {expected} bytes, found {actual})")]
    Modified {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// Creating the temporary hard link failed; the candidate is untouched.
    #[error("cannot create temporary link {temp} for {path}: {source}")]
    TempLink {
        path: PathBuf,
        temp: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Renaming the temporary over the candidate failed; the candidate is untouched.
    #[error("cannot replace {path}: {source}")]
    Replace {
        path: PathBuf,
        temp: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LinkError {
    /// Path of the file the error concerns.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::SourceUnavailable { path, .. }
            | Self::CandidateUnavailable { path, .. }
            | Self::CrossDevice { path, .. }
            | Self::Modified { path, .. }
            | Self::TempLink { path, .. }
            | Self::Replace { path, .. } => path,
            Self::SourceChanged(path) => path,
        }
    }

    /// Short machine-readable kind for reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::SourceChanged(_) => "source_changed",
            Self::CandidateUnavailable { .. } => "candidate_unavailable",
            Self::CrossDevice { .. } => "cross_device",
            Self::Modified { .. } => "modified",
            Self::TempLink { .. } => "temp_link",
            Self::Replace { .. } => "replace",
        }
    }
}

/// Result of linking one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The candidate now resolves to the canonical source's inode.
    Linked,
    /// The candidate already shared the inode; nothing was changed.
    AlreadyLinked,
}

/// Results of linking every candidate of one plan.
#[derive(Debug, Default)]
pub struct GroupLinkResult {
    /// Candidates turned into links
    pub linked: Vec<PathBuf>,
    /// Candidates found already linked at execution time
    pub already_linked: Vec<PathBuf>,
    /// Per-candidate failures
    pub errors: Vec<LinkError>,
    /// Whether remaining candidates were left alone because of shutdown
    pub interrupted: bool,
}

impl GroupLinkResult {
    /// Number of links created.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.linked.len()
    }

    /// Check if every attempted candidate succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Callback trait for per-candidate link reporting.
///
/// With more than one job the methods are called from worker threads.
pub trait LinkProgressCallback: Send + Sync {
    /// Called after a candidate was turned into a link.
    fn on_link_success(&self, path: &Path);

    /// Called when a candidate turned out to be linked already.
    fn on_already_linked(&self, _path: &Path) {}

    /// Called after a candidate failed.
    fn on_link_failure(&self, path: &Path, error: &LinkError);
}

/// Executes link plans against the filesystem.
#[derive(Debug, Clone)]
pub struct LinkExecutor {
    /// Worker threads for the candidates of one group
    jobs: usize,
    /// Checked between candidates when running sequentially
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for LinkExecutor {
    fn default() -> Self {
        Self {
            jobs: 1,
            shutdown_flag: None,
        }
    }
}

impl LinkExecutor {
    /// Create a sequential executor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Link the candidates of one group on `jobs` threads.
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Make `candidate` a hard link to `source`.
    ///
    /// `source_inode` and `expected_size` are the values recorded at hashing
    /// time; the source and candidate are re-checked against them first.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError`] if either file changed or cannot be stat'ed, if
    /// they live on different devices, or if the link or rename fails.
    pub fn link_candidate(
        &self,
        source: &Path,
        source_inode: InodeKey,
        expected_size: u64,
        candidate: &Path,
    ) -> Result<LinkOutcome, LinkError> {
        let source_meta =
            fs::metadata(source).map_err(|e| LinkError::SourceUnavailable {
                path: source.to_path_buf(),
                source: e,
            })?;
        let current_source = identity(&source_meta).map_err(|e| LinkError::SourceUnavailable {
            path: source.to_path_buf(),
            source: e,
        })?;
        if current_source != source_inode || source_meta.len() != expected_size {
            log::warn!("Canonical source changed since scan: {}", source.display());
            return Err(LinkError::SourceChanged(source.to_path_buf()));
        }

        let candidate_meta =
            fs::symlink_metadata(candidate).map_err(|e| LinkError::CandidateUnavailable {
                path: candidate.to_path_buf(),
                source: e,
            })?;
        let current_candidate =
            identity(&candidate_meta).map_err(|e| LinkError::CandidateUnavailable {
                path: candidate.to_path_buf(),
                source: e,
            })?;

        if current_candidate == current_source {
            log::debug!("Already linked: {}", candidate.display());
            return Ok(LinkOutcome::AlreadyLinked);
        }
        if !current_candidate.same_device(&current_source) {
            return Err(LinkError::CrossDevice {
                path: candidate.to_path_buf(),
                canonical: source.to_path_buf(),
            });
        }
        if !candidate_meta.is_file() || candidate_meta.len() != expected_size {
            log::warn!(
                "File modified since scan: {} (size {} -> {})",
                candidate.display(),
                expected_size,
                candidate_meta.len()
            );
            return Err(LinkError::Modified {
                path: candidate.to_path_buf(),
                expected: expected_size,
                actual: candidate_meta.len(),
            });
        }

        let temp = temp_path_for(candidate);
        fs::hard_link(source, &temp).map_err(|e| LinkError::TempLink {
            path: candidate.to_path_buf(),
            temp: temp.clone(),
            source: e,
        })?;

        if let Err(e) = fs::rename(&temp, candidate) {
            if let Err(cleanup) = fs::remove_file(&temp) {
                log::error!(
                    "Failed to remove temporary link {}: {}",
                    temp.display(),
                    cleanup
                );
            }
            log::error!("Rename over {} failed: {}", candidate.display(), e);
            return Err(LinkError::Replace {
                path: candidate.to_path_buf(),
                temp,
                source: e,
            });
        }

        log::info!(
            "Linked {} -> {}",
            candidate.display(),
            source.display()
        );
        Ok(LinkOutcome::Linked)
    }

    /// Link every candidate of a plan.
    ///
    /// Candidates are independent of each other once the source is fixed, so
    /// with more than one job they run on a rayon pool. Sequential runs stop
    /// between candidates when shutdown is requested; a parallel batch is
    /// always finished.
    pub fn link_plan(
        &self,
        plan: &LinkPlan,
        progress: Option<&dyn LinkProgressCallback>,
    ) -> GroupLinkResult {
        let link_one = |candidate: &PathBuf| {
            let result = self.link_candidate(
                &plan.canonical_source,
                plan.source_inode,
                plan.size,
                candidate,
            );
            if let Some(cb) = progress {
                match &result {
                    Ok(LinkOutcome::Linked) => cb.on_link_success(candidate),
                    Ok(LinkOutcome::AlreadyLinked) => cb.on_already_linked(candidate),
                    Err(e) => cb.on_link_failure(candidate, e),
                }
            }
            (candidate.clone(), result)
        };

        let mut interrupted = false;
        let results: Vec<(PathBuf, Result<LinkOutcome, LinkError>)> =
            if self.jobs > 1 && plan.candidates.len() > 1 {
                match rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build() {
                    Ok(pool) => pool.install(|| plan.candidates.par_iter().map(link_one).collect()),
                    Err(e) => {
                        log::warn!("Failed to build linking pool, linking sequentially: {}", e);
                        plan.candidates.iter().map(link_one).collect()
                    }
                }
            } else {
                let mut out = Vec::with_capacity(plan.candidates.len());
                for candidate in &plan.candidates {
                    if self.is_shutdown_requested() {
                        interrupted = true;
                        break;
                    }
                    out.push(link_one(candidate));
                }
                out
            };

        let mut group = GroupLinkResult {
            interrupted,
            ..GroupLinkResult::default()
        };
        for (path, result) in results {
            match result {
                Ok(LinkOutcome::Linked) => group.linked.push(path),
                Ok(LinkOutcome::AlreadyLinked) => group.already_linked.push(path),
                Err(e) => group.errors.push(e),
            }
        }

        group
    }
}

fn identity(metadata: &Metadata) -> io::Result<InodeKey> {
    InodeKey::from_metadata(metadata).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::Unsupported,
            "inode identity unavailable on this platform",
        )
    })
}

/// Hidden sibling name for the temporary link.
fn temp_path_for(candidate: &Path) -> PathBuf {
    let name = candidate
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let temp_name = format!(".{}.rustlink-{}-{}.tmp", name, std::process::id(), n);
    candidate.with_file_name(temp_name)
}
