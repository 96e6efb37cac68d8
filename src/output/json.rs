//! JSON output formatter for run reports.
//!
//! Provides machine-readable output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "root": "/srv/docs",
//!   "filename": "config.yml",
//!   "mode": "automatic",
//!   "stats": {
//!     "total_files": 3,
//!     "groups_found": 1,
//!     "groups_created": 1,
//!     "links_created": 1,
//!     "errors": 0
//!   },
//!   "groups": [
//!     {
//!       "digest": "abc123...",
//!       "size": 2,
//!       "canonical_source": "/srv/docs/a/config.yml",
//!       "already_linked": [],
//!       "candidates": ["/srv/docs/b/config.yml"],
//!       "linked": ["/srv/docs/b/config.yml"],
//!       "outcome": "linked"
//!     }
//!   ],
//!   "errors": [],
//!   "exit_code": 0,
//!   "interrupted": false
//! }
//! ```
//!
//! `stats` carries every counter of [`RunStats`] (the abbreviated sample
//! above omits some) plus the `errors` total.
//!
//! # Example
//!
//! ```
//! use rustlink::output::json::JsonOutput;
//! use rustlink::report::RunReport;
//! use std::path::Path;
//!
//! let report = RunReport::new(Path::new("/srv/docs"), "config.yml", "dry-run");
//! let output = JsonOutput::new(&report);
//! assert!(output.to_json().unwrap().contains("\"exit_code\":0"));
//! ```

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::report::{FileError, GroupReport, RunReport, RunStats};

/// Counters plus the error total.
#[derive(Debug, Clone, Serialize)]
pub struct JsonStats {
    /// Individual counters
    #[serde(flatten)]
    pub counters: RunStats,
    /// Total per-file errors
    pub errors: usize,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Search root
    pub root: &'a PathBuf,
    /// Target file name
    pub filename: &'a str,
    /// Run mode label
    pub mode: &'a str,
    /// Statistics
    pub stats: JsonStats,
    /// Handled groups
    pub groups: &'a [GroupReport],
    /// Per-file errors
    pub errors: &'a [FileError],
    /// Process exit code for this run
    pub exit_code: i32,
    /// Whether the run was interrupted
    pub interrupted: bool,
}

impl<'a> JsonOutput<'a> {
    /// Create the JSON view of a report.
    #[must_use]
    pub fn new(report: &'a RunReport) -> Self {
        Self {
            root: &report.root,
            filename: &report.filename,
            mode: &report.mode,
            stats: JsonStats {
                counters: report.stats,
                errors: report.stats.errors(),
            },
            groups: &report.groups,
            errors: &report.errors,
            exit_code: report.exit_code().as_i32(),
            interrupted: report.interrupted,
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON output: {0}")]
    Io(#[from] std::io::Error),
}
