//! Driver loop that decides what happens to each link plan.
//!
//! The planner only computes plans. The [`Driver`] walks them in order and,
//! depending on the [`RunMode`], asks for confirmation, executes, or merely
//! records what would happen. Shutdown is checked between groups, never in
//! the middle of one candidate.
//!
//! Confirmation goes through the [`Confirm`] trait so the loop can be tested
//! without a terminal. [`TerminalPrompt`] is the interactive implementation.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use super::link::{LinkExecutor, LinkProgressCallback};
use crate::duplicates::LinkPlan;
use crate::report::{GroupOutcome, RunReport};

/// How plans are acted upon. Exactly one mode per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Ask before each group
    Interactive,
    /// Link every group without asking
    Automatic,
    /// Report without touching the filesystem
    DryRun,
}

impl RunMode {
    /// Label used in reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::Automatic => "automatic",
            Self::DryRun => "dry-run",
        }
    }

    /// Whether the mode may run in parallel.
    #[must_use]
    pub fn allows_parallelism(self) -> bool {
        !matches!(self, Self::Interactive)
    }
}

/// Errors that stop the driver loop.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Standard input was closed while waiting for an answer.
    #[error("standard input closed while waiting for confirmation")]
    PromptClosed,

    /// Reading the answer or writing the prompt failed.
    #[error("confirmation prompt failed: {0}")]
    Prompt(#[from] io::Error),

    /// Interactive confirmation was combined with parallel linking.
    #[error("interactive confirmation cannot run with {0} jobs")]
    ParallelInteractive(usize),
}

/// Source of per-group decisions.
pub trait Confirm {
    /// Return whether the group should be linked.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when no answer can be obtained.
    fn confirm(&mut self, plan: &LinkPlan) -> Result<bool, DriverError>;
}

/// Answers every question with the same value.
#[derive(Debug, Clone, Copy)]
pub struct AlwaysConfirm(pub bool);

impl Confirm for AlwaysConfirm {
    fn confirm(&mut self, _plan: &LinkPlan) -> Result<bool, DriverError> {
        Ok(self.0)
    }
}

/// Line-based yes/no prompt.
///
/// An empty answer accepts; only `n` or `no` (any case) declines.
///
/// A blocked read is not woken by Ctrl+C: the interrupt is noticed once the
/// pending line is submitted, and that answer is then discarded.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
    question: String,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stdout> {
    /// Prompt on the process terminal.
    #[must_use]
    pub fn stdio(question: impl Into<String>) -> Self {
        Self::new(io::stdin().lock(), io::stdout(), question)
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    /// Prompt with `question` on `output`, reading answers from `input`.
    #[must_use]
    pub fn new(input: R, output: W, question: impl Into<String>) -> Self {
        Self {
            input,
            output,
            question: question.into(),
            shutdown_flag: None,
        }
    }

    /// Decline instead of answering once shutdown is requested.
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
}

impl<R: BufRead, W: Write> Confirm for TerminalPrompt<R, W> {
    fn confirm(&mut self, _plan: &LinkPlan) -> Result<bool, DriverError> {
        write!(self.output, "{} [Y/n]: ", self.question)?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line)?;
        if self.is_shutdown_requested() {
            log::debug!("Shutdown requested at prompt, ignoring answer");
            return Ok(false);
        }
        if read == 0 {
            return Err(DriverError::PromptClosed);
        }
        Ok(parse_answer(&line))
    }
}

/// Interpret a prompt answer.
#[must_use]
pub fn parse_answer(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    !(answer == "n" || answer == "no")
}

/// Receives presentation events from the driver.
pub trait PlanObserver {
    /// Called before a group is handled (and before any prompt).
    fn on_group_start(&mut self, _index: usize, _plan: &LinkPlan) {}

    /// Called after a group was handled.
    fn on_group_end(&mut self, _index: usize, _plan: &LinkPlan, _outcome: GroupOutcome) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default)]
pub struct SilentObserver;

impl PlanObserver for SilentObserver {}

/// Runs plans in order according to the mode.
pub struct Driver<'a> {
    mode: RunMode,
    executor: LinkExecutor,
    shutdown_flag: Option<Arc<AtomicBool>>,
    link_progress: Option<&'a dyn LinkProgressCallback>,
    jobs: usize,
}

impl<'a> Driver<'a> {
    /// Create a driver with a sequential executor.
    #[must_use]
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            executor: LinkExecutor::new(),
            shutdown_flag: None,
            link_progress: None,
            jobs: 1,
        }
    }

    /// Link candidates of one group on `jobs` threads.
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self.executor = self.executor.with_jobs(self.jobs);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.executor = self.executor.with_shutdown_flag(Arc::clone(&flag));
        self.shutdown_flag = Some(flag);
        self
    }

    /// Report each candidate as it is linked.
    #[must_use]
    pub fn with_link_progress(mut self, progress: &'a dyn LinkProgressCallback) -> Self {
        self.link_progress = Some(progress);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Handle every plan and record the results in `report`.
    ///
    /// Stops early, with `report.interrupted` set, when shutdown is requested.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] if the prompt fails or if interactive mode is
    /// combined with more than one job. Groups handled before the failure
    /// stay recorded in `report`.
    pub fn run(
        &self,
        plans: &[LinkPlan],
        confirm: &mut dyn Confirm,
        observer: &mut dyn PlanObserver,
        report: &mut RunReport,
    ) -> Result<(), DriverError> {
        if self.mode == RunMode::Interactive && self.jobs > 1 {
            return Err(DriverError::ParallelInteractive(self.jobs));
        }

        for (index, plan) in plans.iter().enumerate() {
            if self.is_shutdown_requested() {
                log::info!("Shutdown requested, {} group(s) left", plans.len() - index);
                report.interrupted = true;
                break;
            }

            observer.on_group_start(index, plan);

            if plan.is_merged() {
                report.record_merged(plan);
                observer.on_group_end(index, plan, GroupOutcome::AlreadyMerged);
                continue;
            }

            let outcome = match self.mode {
                RunMode::DryRun => report.record_dry_run(plan),
                RunMode::Interactive => {
                    let accepted = confirm.confirm(plan)?;
                    if self.is_shutdown_requested() {
                        log::info!(
                            "Shutdown requested at prompt, {} group(s) left",
                            plans.len() - index
                        );
                        report.interrupted = true;
                        break;
                    }
                    if !accepted {
                        log::debug!("Group {} declined", plan.digest_hex());
                        report.record_declined(plan);
                        observer.on_group_end(index, plan, GroupOutcome::Declined);
                        continue;
                    }
                    self.execute(plan, report)
                }
                RunMode::Automatic => self.execute(plan, report),
            };

            observer.on_group_end(index, plan, outcome);
            if report.interrupted {
                break;
            }
        }

        Ok(())
    }

    fn execute(&self, plan: &LinkPlan, report: &mut RunReport) -> GroupOutcome {
        let result = self.executor.link_plan(plan, self.link_progress);
        if result.interrupted {
            report.interrupted = true;
        }
        report.record_executed(plan, result)
    }
}
