//! Human-readable terminal output.
//!
//! Everything here writes to a caller-supplied [`Write`] and takes its look
//! from an immutable [`Palette`], so the pipeline never depends on how (or
//! whether) the run is displayed.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytesize::ByteSize;

use super::Palette;
use crate::actions::driver::{PlanObserver, RunMode};
use crate::actions::link::{LinkError, LinkProgressCallback};
use crate::duplicates::LinkPlan;
use crate::report::{GroupOutcome, RunReport};
use crate::scanner::path_utils::display_relative;
use crate::scanner::HashError;

/// Width of separators and boxes, in columns.
const WIDTH: usize = 64;

/// Print the run header.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_header<W: Write>(
    out: &mut W,
    palette: &Palette,
    root: &Path,
    filename: &str,
    excluded: &[String],
    mode: RunMode,
) -> io::Result<()> {
    write_box(out, palette, "HARD LINK MANAGER", &[])?;
    writeln!(
        out,
        "{} {} {}",
        palette.icon("📁", "*"),
        palette.info("Directory:"),
        palette.bold(&root.display().to_string())
    )?;
    writeln!(
        out,
        "{} {} {}",
        palette.icon("🔎", "*"),
        palette.info("File name:"),
        palette.bold(filename)
    )?;
    if !excluded.is_empty() {
        writeln!(
            out,
            "{} {} {}",
            palette.icon("🚫", "*"),
            palette.info("Excluding:"),
            palette.bold(&excluded.join(", "))
        )?;
    }
    if mode == RunMode::DryRun {
        writeln!(
            out,
            "{}",
            palette.warning(&format!(
                "{} DRY RUN: no changes will be made",
                palette.icon("⚠", "!")
            ))
        )?;
    }
    write_separator(out, palette)
}

/// Print the outcome of the scan phase.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_scan_result<W: Write>(
    out: &mut W,
    palette: &Palette,
    filename: &str,
    found: usize,
) -> io::Result<()> {
    if found == 0 {
        writeln!(
            out,
            "{}",
            palette.warning(&format!(
                "{} No files named '{}' were found",
                palette.icon("⚠", "!"),
                filename
            ))
        )
    } else {
        writeln!(
            out,
            "{}",
            palette.success(&format!(
                "{} Found {} file(s) named '{}'",
                palette.icon("✓", "+"),
                found,
                filename
            ))
        )
    }
}

/// Print files that could not be hashed.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_hash_errors<W: Write>(
    out: &mut W,
    palette: &Palette,
    root: &Path,
    errors: &[HashError],
) -> io::Result<()> {
    for err in errors {
        writeln!(
            out,
            "{}",
            palette.error(&format!(
                "{} Cannot read {}: {}",
                palette.icon("✗", "x"),
                display_relative(err.path(), root),
                err
            ))
        )?;
    }
    Ok(())
}

/// Print the outcome of the grouping phase.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_grouping_result<W: Write>(
    out: &mut W,
    palette: &Palette,
    groups: usize,
) -> io::Result<()> {
    if groups == 0 {
        writeln!(
            out,
            "{}",
            palette.info(&format!(
                "{} All files have unique content, nothing to link",
                palette.icon("ℹ", "i")
            ))
        )
    } else {
        writeln!(
            out,
            "{}",
            palette.success(&format!(
                "{} Found {} group(s) of files with identical content",
                palette.icon("✓", "+"),
                groups
            ))
        )
    }
}

/// Print the summary box and the closing line.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_summary<W: Write>(
    out: &mut W,
    palette: &Palette,
    report: &RunReport,
) -> io::Result<()> {
    let stats = &report.stats;
    let mut lines = vec![
        format!("Groups linked:        {}", stats.groups_created),
        format!("Hard links created:   {}", stats.links_created),
        format!("Already linked:       {}", stats.files_already_linked),
        format!(
            "Groups skipped:       {} ({} declined, {} already merged)",
            stats.groups_skipped, stats.groups_declined, stats.groups_merged
        ),
    ];
    if stats.bytes_linked > 0 {
        lines.push(format!(
            "Storage now shared:   {}",
            ByteSize::b(stats.bytes_linked)
        ));
    }
    if stats.errors() > 0 {
        lines.push(format!("Errors:               {}", stats.errors()));
    }

    write_separator(out, palette)?;
    write_box(out, palette, "SUMMARY", &lines)?;
    writeln!(out)?;

    let closing = if report.interrupted {
        palette.warning(&format!(
            "{} Interrupted: remaining groups were left untouched",
            palette.icon("⚠", "!")
        ))
    } else if stats.groups_created > 0 {
        palette.success(&format!("{} Done, changes were made", palette.icon("✨", "+")))
    } else if stats.groups_declined > 0 {
        palette.warning(&format!(
            "{} Finished without creating links (groups declined)",
            palette.icon("ℹ", "i")
        ))
    } else {
        palette.info(&format!("{} No changes were required", palette.icon("ℹ", "i")))
    };
    writeln!(out, "{}", closing)
}

fn write_separator<W: Write>(out: &mut W, palette: &Palette) -> io::Result<()> {
    let rule = palette.icon("━", "-").repeat(WIDTH);
    writeln!(out, "\n{}\n", palette.muted(&rule))
}

/// Draw a titled box; body lines are padded to the box width.
fn write_box<W: Write>(
    out: &mut W,
    palette: &Palette,
    title: &str,
    lines: &[String],
) -> io::Result<()> {
    let (h, v, tl, tr, ml, mr, bl, br) = if palette.decorations() {
        ("═", "║", "╔", "╗", "╠", "╣", "╚", "╝")
    } else {
        ("=", "|", "+", "+", "+", "+", "+", "+")
    };
    let inner = WIDTH - 2;
    let edge = |left: &str, right: &str| format!("{}{}{}", left, h.repeat(inner), right);
    let row = |text: &str| {
        let len = text.chars().count();
        let pad = inner.saturating_sub(len + 2);
        format!("{} {}{} {}", v, text, " ".repeat(pad), v)
    };

    let title_len = title.chars().count();
    let left = inner.saturating_sub(title_len) / 2;
    let right = inner.saturating_sub(title_len + left);
    let title_row = format!("{}{}{}{}{}", v, " ".repeat(left), title, " ".repeat(right), v);

    writeln!(out, "{}", palette.accent(&edge(tl, tr)))?;
    writeln!(out, "{}", palette.accent(&title_row))?;
    if !lines.is_empty() {
        writeln!(out, "{}", palette.accent(&edge(ml, mr)))?;
        for line in lines {
            writeln!(out, "{}", palette.accent(&row(line)))?;
        }
    }
    writeln!(out, "{}", palette.accent(&edge(bl, br)))
}

/// Prints each group before and after the driver handles it.
pub struct TextObserver<W: Write> {
    out: W,
    palette: Palette,
    root: PathBuf,
}

impl<W: Write> TextObserver<W> {
    /// Create an observer writing to `out`.
    pub fn new(out: W, palette: Palette, root: &Path) -> Self {
        Self {
            out,
            palette,
            root: root.to_path_buf(),
        }
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn rel(&self, path: &Path) -> String {
        display_relative(path, &self.root)
    }

    fn write_group(&mut self, index: usize, plan: &LinkPlan) -> io::Result<()> {
        let p = self.palette;
        write_separator(&mut self.out, &p)?;

        let digest = plan.digest_hex();
        writeln!(
            self.out,
            "{} {}\n",
            p.accent(&format!("{} GROUP #{}", p.icon("🔍", "#"), index + 1)),
            p.muted(&format!("- Hash: {}...", &digest[..16]))
        )?;
        writeln!(
            self.out,
            "{} {}",
            p.success(&format!("{} Source file:", p.icon("📌", ">"))),
            p.bold(&self.rel(&plan.canonical_source))
        )?;
        writeln!(
            self.out,
            "{}\n",
            p.muted(&format!(
                "   Size: {} | Inode: {}",
                ByteSize::b(plan.size),
                plan.source_inode
            ))
        )?;

        if !plan.already_linked.is_empty() {
            writeln!(
                self.out,
                "{}",
                p.muted(&format!(
                    "{} Already linked ({}):",
                    p.icon("⏭", "-"),
                    plan.already_linked.len()
                ))
            )?;
            for path in &plan.already_linked {
                let bullet = p.icon("•", "-");
                writeln!(self.out, "{}", p.muted(&format!("   {} {}", bullet, self.rel(path))))?;
            }
            writeln!(self.out)?;
        }

        if plan.is_merged() {
            return Ok(());
        }

        writeln!(
            self.out,
            "{}",
            p.info(&format!(
                "{} Files to link ({}):",
                p.icon("📋", "*"),
                plan.candidates.len()
            ))
        )?;
        for (i, path) in plan.candidates.iter().enumerate() {
            writeln!(self.out, "{}", p.info(&format!("   {}. {}", i + 1, self.rel(path))))?;
        }
        writeln!(self.out)?;
        self.out.flush()
    }

    fn write_outcome(&mut self, plan: &LinkPlan, outcome: GroupOutcome) -> io::Result<()> {
        let p = self.palette;
        let line = match outcome {
            GroupOutcome::AlreadyMerged => p.info(&format!(
                "{} All files in this group are already linked",
                p.icon("ℹ", "i")
            )),
            GroupOutcome::Declined => {
                p.warning(&format!("{} Group skipped by user", p.icon("⚠", "!")))
            }
            GroupOutcome::WouldLink => p.info(&format!(
                "{} [DRY RUN] Would create {} hard link(s)",
                p.icon("ℹ", "i"),
                plan.candidates.len()
            )),
            GroupOutcome::Interrupted => p.warning(&format!(
                "{} Interrupted before this group was linked",
                p.icon("⚠", "!")
            )),
            GroupOutcome::Linked | GroupOutcome::Failed => return Ok(()),
        };
        writeln!(self.out, "{}", line)?;
        self.out.flush()
    }
}

impl<W: Write> PlanObserver for TextObserver<W> {
    fn on_group_start(&mut self, index: usize, plan: &LinkPlan) {
        if let Err(e) = self.write_group(index, plan) {
            log::debug!("Failed to write group: {}", e);
        }
    }

    fn on_group_end(&mut self, _index: usize, plan: &LinkPlan, outcome: GroupOutcome) {
        if let Err(e) = self.write_outcome(plan, outcome) {
            log::debug!("Failed to write group outcome: {}", e);
        }
    }
}

/// Prints one line per linked or failed candidate on stdout.
#[derive(Debug, Clone)]
pub struct LinkLines {
    palette: Palette,
    root: PathBuf,
}

impl LinkLines {
    /// Create a printer that shows paths relative to `root`.
    #[must_use]
    pub fn new(palette: Palette, root: &Path) -> Self {
        Self {
            palette,
            root: root.to_path_buf(),
        }
    }

    fn success_line(&self, path: &Path) -> String {
        self.palette.success(&format!(
            "{} Hard link created: {}",
            self.palette.icon("✓", "+"),
            display_relative(path, &self.root)
        ))
    }

    fn failure_line(&self, path: &Path, error: &LinkError) -> String {
        self.palette.error(&format!(
            "{} Cannot link {}: {}",
            self.palette.icon("✗", "x"),
            display_relative(path, &self.root),
            error
        ))
    }
}

impl LinkProgressCallback for LinkLines {
    fn on_link_success(&self, path: &Path) {
        let _ = writeln!(io::stdout().lock(), "{}", self.success_line(path));
    }

    fn on_already_linked(&self, path: &Path) {
        let _ = writeln!(
            io::stdout().lock(),
            "{}",
            self.palette.muted(&format!(
                "{} Already linked: {}",
                self.palette.icon("⏭", "-"),
                display_relative(path, &self.root)
            ))
        );
    }

    fn on_link_failure(&self, path: &Path, error: &LinkError) {
        let _ = writeln!(io::stdout().lock(), "{}", self.failure_line(path, error));
    }
}
