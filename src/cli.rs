//! Command-line interface definitions for rustlink.
//!
//! This module defines all CLI arguments using the clap derive API.
//!
//! # Example
//!
//! ```bash
//! # Ask before linking each group of identical files
//! rustlink config.yml --root ~/projects
//!
//! # Link everything without asking, using four threads
//! rustlink config.yml --auto --jobs 4
//!
//! # Show what would happen as JSON
//! rustlink config.yml --dry-run --output json
//!
//! # Only prune .git (the file name must come before --exclude)
//! rustlink config.yml --exclude .git
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replace identical copies of a file with hard links.
///
/// rustlink finds every file with the given name below the search root,
/// groups them by content (BLAKE3), and turns each group of identical copies
/// into hard links to a single inode.
#[derive(Debug, Parser)]
#[command(name = "rustlink")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Without --auto or --dry-run every group is confirmed at a prompt. \
Ctrl+C at a prompt takes effect once Enter is pressed and that answer is ignored; \
a second Ctrl+C exits immediately.")]
pub struct Cli {
    /// Exact file name to look for (case-sensitive)
    #[arg(value_name = "FILENAME")]
    pub filename: String,

    /// Directory to search (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Directory names to skip, replacing the defaults
    ///
    /// Takes any number of names; pass it without names to search
    /// everywhere. Place FILENAME before this option.
    #[arg(short, long, value_name = "NAME", num_args = 0..)]
    pub exclude: Option<Vec<String>>,

    /// Also skip excluded names below the first directory level
    #[arg(long)]
    pub exclude_nested: bool,

    /// Link every group without asking
    #[arg(short, long, conflicts_with = "dry_run")]
    pub auto: bool,

    /// Show what would be linked without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Worker threads for hashing and linking (requires --auto or --dry-run above 1)
    #[arg(short, long, value_name = "N", value_parser = parse_jobs)]
    pub jobs: Option<usize>,

    /// Output format (json requires --auto or --dry-run)
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// ASCII output without icons or box drawing
    #[arg(long)]
    pub plain: bool,

    /// Increase verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress bars and log output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print fatal errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// Output format for the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    /// JSON document for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a worker count, which must be at least one.
///
/// # Examples
///
/// ```
/// use rustlink::cli::parse_jobs;
///
/// assert_eq!(parse_jobs("4").unwrap(), 4);
/// assert!(parse_jobs("0").is_err());
/// ```
pub fn parse_jobs(s: &str) -> Result<usize, String> {
    let jobs: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number of jobs: {}", s))?;
    if jobs == 0 {
        return Err("Number of jobs must be at least 1".to_string());
    }
    Ok(jobs)
}
