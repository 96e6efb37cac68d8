//! BLAKE3 content hasher with streaming support.
//!
//! # Overview
//!
//! The [`Hasher`] reads a file in [`CHUNK_SIZE`] blocks and feeds every block
//! to BLAKE3, so memory use stays flat regardless of file size. The digest
//! depends on content alone; the path, name and metadata never enter it.
//!
//! [`Hasher::fingerprint_all`] turns scan entries into [`FileRecord`]s. The
//! size and inode are read from the same open handle that is hashed, so a
//! record always describes one consistent file. With more than one job the
//! work is spread over a rayon pool; results are still returned sorted by the
//! scanner's sequence number, never by completion order.
//!
//! # Example
//!
//! ```no_run
//! use rustlink::scanner::{hash_to_hex, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let digest = hasher.hash_file(Path::new("config.yml")).unwrap();
//! println!("{}", hash_to_hex(&digest));
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::{FileRecord, HashError, InodeKey, ScanEntry};
use crate::progress::ProgressCallback;

/// Read block size for streaming hashes (8 KiB).
pub const CHUNK_SIZE: usize = 8 * 1024;

/// A 256-bit BLAKE3 digest.
pub type Digest = [u8; 32];

/// Format a digest as lowercase hexadecimal.
#[must_use]
pub fn hash_to_hex(digest: &Digest) -> String {
    blake3::Hash::from(*digest).to_hex().to_string()
}

/// Streaming content hasher.
#[derive(Debug, Clone, Default)]
pub struct Hasher {
    /// Optional shutdown flag; once set, pending files are not hashed
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Hasher {
    /// Create a new hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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

    /// Hash everything a reader yields.
    ///
    /// # Errors
    ///
    /// Returns the first read error other than `Interrupted`.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> io::Result<Digest> {
        let mut hasher = blake3::Hasher::new();
        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buf[..n]);
        }
        Ok(*hasher.finalize().as_bytes())
    }

    /// Hash the full content of a file.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn hash_file(&self, path: &Path) -> Result<Digest, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        self.hash_reader(file).map_err(|e| HashError::from_io(path, e))
    }

    /// Build the record for one scan entry.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened, stat'ed or read,
    /// or if the platform has no inode identity.
    pub fn fingerprint(&self, entry: &ScanEntry) -> Result<FileRecord, HashError> {
        let path = entry.path.as_path();
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let metadata = file.metadata().map_err(|e| HashError::from_io(path, e))?;
        let inode = InodeKey::from_metadata(&metadata)
            .ok_or_else(|| HashError::Unsupported(path.to_path_buf()))?;
        let digest = self
            .hash_reader(file)
            .map_err(|e| HashError::from_io(path, e))?;

        Ok(FileRecord::new(
            entry.seq,
            entry.path.clone(),
            metadata.len(),
            inode,
            digest,
        ))
    }

    /// Fingerprint every entry, sequentially or on `jobs` threads.
    ///
    /// Returns the successful records sorted by sequence number together
    /// with the per-file errors. Entries left unhashed because shutdown was
    /// requested appear in neither list.
    pub fn fingerprint_all(
        &self,
        entries: &[ScanEntry],
        jobs: usize,
        progress: Option<&Arc<dyn ProgressCallback>>,
    ) -> (Vec<FileRecord>, Vec<HashError>) {
        if let Some(progress) = progress {
            progress.on_phase_start("hash", entries.len());
        }

        let done = AtomicUsize::new(0);
        let work = |entry: &ScanEntry| -> Option<Result<FileRecord, HashError>> {
            if self.is_shutdown_requested() {
                return None;
            }
            let result = self.fingerprint(entry);
            if let Some(progress) = progress {
                let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                progress.on_progress(current, &entry.path.to_string_lossy());
            }
            Some(result)
        };

        let results: Vec<Result<FileRecord, HashError>> = if jobs > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(|| entries.par_iter().filter_map(work).collect()),
                Err(e) => {
                    log::warn!("Failed to build hashing pool, hashing sequentially: {}", e);
                    entries.iter().filter_map(work).collect()
                }
            }
        } else {
            entries.iter().filter_map(work).collect()
        };

        if let Some(progress) = progress {
            progress.on_phase_end("hash");
        }

        let mut records = Vec::with_capacity(results.len());
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    log::debug!("Cannot hash {}", e);
                    errors.push(e);
                }
            }
        }
        records.sort_by_key(|r| r.seq);

        log::debug!(
            "Hashed {} file(s), {} error(s), {} job(s)",
            records.len(),
            errors.len(),
            jobs.max(1)
        );

        (records, errors)
    }
}
