//! rustlink - Hard-link identical copies of a file
//!
//! Finds every file with one exact name below a root directory, groups the
//! copies by content (BLAKE3), and replaces the duplicates in each group with
//! hard links to a single inode, so they stay in sync and share storage.
//!
//! The pipeline is a chain of small stages:
//!
//! 1. [`scanner::Scanner`] walks the tree and collects matching regular files
//! 2. [`scanner::Hasher`] fingerprints them (content digest, size, inode)
//! 3. [`duplicates::build_content_groups`] groups identical content
//! 4. [`duplicates::plan_all`] picks a canonical source per group
//! 5. [`actions::Driver`] confirms and executes the plans
//! 6. [`report::RunReport`] collects what happened for [`output`]

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod signal;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};

use crate::actions::{AlwaysConfirm, Confirm, Driver, RunMode, TerminalPrompt};
use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::duplicates::{build_content_groups, plan_all};
use crate::error::ExitCode;
use crate::output::{text, JsonOutput, LinkLines, Palette, TextObserver};
use crate::progress::{Progress, ProgressCallback};
use crate::report::RunReport;
use crate::scanner::path_utils::normalize_lexically;
use crate::scanner::{Hasher, InodeKey, Scanner, ScannerConfig};

/// Question asked for each group in interactive mode.
pub const PROMPT: &str = "Create hard links for this group?";

/// Run the application with parsed arguments.
///
/// Returns the exit code the process should end with. Per-file problems are
/// part of the report; only fatal problems (bad configuration, unusable
/// root, closed prompt) are returned as errors.
///
/// # Errors
///
/// Returns an error if configuration, scanning the root, or the interactive
/// prompt fails, or if the flags form an unsupported combination.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config =
        Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.merge_cli(&cli);

    let mode = select_mode(&cli);
    let jobs = config.effective_jobs();
    let json = cli.output == OutputFormat::Json;
    if mode == RunMode::Interactive && jobs > 1 {
        bail!("--jobs above 1 requires --auto or --dry-run");
    }
    if mode == RunMode::Interactive && json {
        bail!("--output json requires --auto or --dry-run");
    }
    if !InodeKey::is_supported() {
        bail!("Hard links cannot be detected on this platform");
    }

    let handler = signal::install_handler().context("Failed to install signal handler")?;
    let palette = Palette::new(!cli.no_color && !json, !cli.plain);

    let mut out: Box<dyn Write> = if json {
        Box::new(io::sink())
    } else {
        Box::new(io::stdout())
    };

    let requested_root = config.root_or_cwd();
    let shown_root = display_root(&requested_root);
    text::write_header(
        &mut out,
        &palette,
        &shown_root,
        &cli.filename,
        &config.exclude,
        mode,
    )?;

    log::info!(
        "Mode: {}, jobs: {}, output: {}",
        mode.label(),
        jobs,
        cli.output
    );

    // Phase 1: scan
    let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(cli.quiet, cli.plain));
    let scanner_config = ScannerConfig::new(cli.filename.clone())
        .with_excluded(config.exclude.clone())
        .with_exclude_nested(config.exclude_nested);
    let scan = Scanner::new(&requested_root, scanner_config)
        .with_shutdown_flag(handler.get_flag())
        .with_progress(Arc::clone(&progress))
        .scan()
        .with_context(|| format!("Failed to scan {}", requested_root.display()))?;

    let mut report = RunReport::new(&scan.root, &cli.filename, mode.label());
    report.stats.total_files = scan.entries.len();
    if scan.interrupted {
        report.interrupted = true;
        return finish(&mut out, &palette, &report, json);
    }

    text::write_scan_result(&mut out, &palette, &cli.filename, scan.entries.len())?;
    if scan.entries.is_empty() {
        return finish_early(&report, json);
    }

    // Phase 2: hash
    let hasher = Hasher::new().with_shutdown_flag(handler.get_flag());
    let (records, hash_errors) = hasher.fingerprint_all(&scan.entries, jobs, Some(&progress));
    text::write_hash_errors(&mut out, &palette, &scan.root, &hash_errors)?;
    for err in &hash_errors {
        report.record_hash_error(err);
    }
    if handler.is_shutdown_requested() {
        report.interrupted = true;
        return finish(&mut out, &palette, &report, json);
    }

    // Phase 3: group and plan
    let (groups, grouping) = build_content_groups(records);
    log::debug!(
        "{} distinct digest(s), {} unique file(s)",
        grouping.distinct_digests,
        grouping.unique_files
    );
    report.stats.groups_found = groups.len();
    text::write_grouping_result(&mut out, &palette, groups.len())?;
    if groups.is_empty() {
        if report.stats.errors() > 0 {
            return finish(&mut out, &palette, &report, json);
        }
        return finish_early(&report, json);
    }
    let plans = plan_all(&groups);

    // Phase 4: confirm and link
    let link_lines = LinkLines::new(palette, &scan.root);
    let mut driver = Driver::new(mode)
        .with_jobs(jobs)
        .with_shutdown_flag(handler.get_flag());
    if !json {
        driver = driver.with_link_progress(&link_lines);
    }

    let mut confirm: Box<dyn Confirm> = match mode {
        RunMode::Interactive => {
            Box::new(TerminalPrompt::stdio(PROMPT).with_shutdown_flag(handler.get_flag()))
        }
        RunMode::Automatic | RunMode::DryRun => Box::new(AlwaysConfirm(true)),
    };
    let mut observer = TextObserver::new(out, palette, &scan.root);
    let outcome = driver.run(&plans, confirm.as_mut(), &mut observer, &mut report);
    let mut out = observer.into_inner();

    let code = finish(&mut out, &palette, &report, json)?;
    outcome.context("Linking stopped")?;
    Ok(code)
}

/// Pick the run mode from the mutually exclusive mode flags.
fn select_mode(cli: &Cli) -> RunMode {
    if cli.dry_run {
        RunMode::DryRun
    } else if cli.auto {
        RunMode::Automatic
    } else {
        RunMode::Interactive
    }
}

/// Print the final report and compute the exit code.
fn finish<W: Write>(
    out: &mut W,
    palette: &Palette,
    report: &RunReport,
    json: bool,
) -> anyhow::Result<ExitCode> {
    if json {
        write_json(report)?;
    } else {
        text::write_summary(out, palette, report)?;
        out.flush()?;
    }
    Ok(report.exit_code())
}

/// Nothing to link: text output already said why, JSON still gets a report.
fn finish_early(report: &RunReport, json: bool) -> anyhow::Result<ExitCode> {
    if json {
        write_json(report)?;
    }
    Ok(report.exit_code())
}

fn write_json(report: &RunReport) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    JsonOutput::new(report)
        .write_to(&mut stdout, true)
        .context("Failed to write JSON output")
}

/// Resolve the root the way the scanner will, for display purposes.
#[must_use]
pub fn display_root(root: &Path) -> std::path::PathBuf {
    std::path::absolute(root)
        .map(|p| normalize_lexically(&p))
        .unwrap_or_else(|_| root.to_path_buf())
}
