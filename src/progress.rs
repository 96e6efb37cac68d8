//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`Progress`] struct which implements
//! [`ProgressCallback`] to show a spinner while the tree is walked and a bar
//! while matches are hashed. Bars are drawn on stderr so the report on stdout
//! stays clean.
//!
//! # Plain Mode
//!
//! When plain mode is enabled, progress reporting uses simplified output:
//! - No spinners or animations
//! - ASCII-only bar characters
//! - Reduced update frequency

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress callback for pipeline phases.
///
/// Implement this trait to receive progress updates while scanning and
/// hashing. Methods may be called from worker threads.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase ("scan" or "hash")
    /// * `total` - Total number of items to process (0 when unknown)
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Current item number (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    scan: Mutex<Option<ProgressBar>>,
    hash: Mutex<Option<ProgressBar>>,
    quiet: bool,
    plain: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    /// * `plain` - If true, uses ASCII bars without animation.
    ///
    /// # Examples
    ///
    /// ```
    /// use rustlink::progress::{Progress, ProgressCallback};
    ///
    /// let progress = Progress::new(false, true);
    /// progress.on_phase_start("hash", 10);
    /// progress.on_phase_end("hash");
    /// ```
    #[must_use]
    pub fn new(quiet: bool, plain: bool) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::stderr()),
            scan: Mutex::new(None),
            hash: Mutex::new(None),
            quiet,
            plain,
        }
    }

    fn scan_style(&self) -> ProgressStyle {
        if self.plain {
            ProgressStyle::with_template("{msg} [{elapsed_precise}] {pos} match(es)")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
        } else {
            ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} match(es)")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        }
    }

    fn hash_style(&self) -> ProgressStyle {
        if self.plain {
            ProgressStyle::with_template("[{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-")
        } else {
            ProgressStyle::with_template(
                "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-")
        }
    }

    fn active_bar(&self) -> Option<ProgressBar> {
        for slot in [&self.hash, &self.scan] {
            if let Ok(guard) = slot.lock() {
                if let Some(ref pb) = *guard {
                    return Some(pb.clone());
                }
            }
        }
        None
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        match phase {
            "scan" => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(self.scan_style());
                pb.set_message("Scanning");
                let tick_rate = if self.plain { 500 } else { 100 };
                pb.enable_steady_tick(Duration::from_millis(tick_rate));
                if let Ok(mut slot) = self.scan.lock() {
                    *slot = Some(pb);
                }
            }
            "hash" => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(self.hash_style());
                pb.set_message("Hashing");
                if let Ok(mut slot) = self.hash.lock() {
                    *slot = Some(pb);
                }
            }
            other => log::trace!("No progress bar for phase '{}'", other),
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active_bar() {
            pb.set_position(current as u64);
            pb.set_message(truncate_path(path, 30));
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        let slot = match phase {
            "scan" => &self.scan,
            "hash" => &self.hash,
            _ => return,
        };
        let taken = slot.lock().ok().and_then(|mut guard| guard.take());
        if let Some(pb) = taken {
            pb.finish_and_clear();
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len >= max_len {
        let tail: String = file_name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
