//! File actions module.
//!
//! This module provides functionality for:
//! - Turning duplicate files into hard links of a canonical source
//! - Driving plans through interactive, automatic or dry-run decisions
//!
//! # Linking
//!
//! The link module never removes a name before its replacement exists:
//! - Hard link the source under a temporary sibling name
//! - Atomically rename the temporary over the candidate
//! - Re-check inode and size first (TOCTOU protection)
//!
//! ```no_run
//! use rustlink::actions::{Driver, RunMode, AlwaysConfirm, SilentObserver};
//! use rustlink::report::RunReport;
//! use std::path::Path;
//!
//! let plans = Vec::new();
//! let mut report = RunReport::new(Path::new("."), "config.yml", "automatic");
//! Driver::new(RunMode::Automatic)
//!     .run(&plans, &mut AlwaysConfirm(true), &mut SilentObserver, &mut report)
//!     .unwrap();
//! ```

pub mod driver;
pub mod link;

// Re-export commonly used types
pub use driver::{
    parse_answer, AlwaysConfirm, Confirm, Driver, DriverError, PlanObserver, RunMode,
    SilentObserver, TerminalPrompt,
};
pub use link::{GroupLinkResult, LinkError, LinkExecutor, LinkOutcome, LinkProgressCallback};
