//! Run statistics and the final report.
//!
//! [`RunReport`] is filled in by the application as the pipeline advances:
//! scan totals first, then hash errors, then one [`GroupReport`] per plan
//! handled by the driver. Counting is identical in automatic and dry-run
//! mode; dry-run records what automatic mode would have done.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::actions::link::{GroupLinkResult, LinkError};
use crate::duplicates::LinkPlan;
use crate::error::ExitCode;
use crate::scanner::HashError;

/// Counters accumulated over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Files matched by name
    pub total_files: usize,
    /// Content groups with two or more members
    pub groups_found: usize,
    /// Groups in which at least one link was created
    pub groups_created: usize,
    /// Groups declined or already fully merged
    pub groups_skipped: usize,
    /// Groups declined at the prompt
    pub groups_declined: usize,
    /// Groups that needed no mutation
    pub groups_merged: usize,
    /// Links created
    pub links_created: usize,
    /// Members that already shared the canonical source's inode
    pub files_already_linked: usize,
    /// Bytes of duplicate content now shared through links
    pub bytes_linked: u64,
    /// Files that could not be hashed
    pub hash_errors: usize,
    /// Candidates that could not be linked
    pub link_errors: usize,
}

impl RunStats {
    /// Total per-file errors.
    #[must_use]
    pub fn errors(&self) -> usize {
        self.hash_errors + self.link_errors
    }
}

/// What happened to one content group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOutcome {
    /// At least one candidate was linked
    Linked,
    /// Dry run: every candidate would be linked
    WouldLink,
    /// The user declined the group
    Declined,
    /// All members already shared one inode
    AlreadyMerged,
    /// Every attempted candidate failed
    Failed,
    /// Shutdown stopped the group before any candidate was handled
    Interrupted,
}

/// Per-group entry of the report.
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    /// Hex digest
    pub digest: String,
    /// Content size in bytes
    pub size: u64,
    /// Canonical source path
    pub canonical_source: PathBuf,
    /// Members already sharing the source's inode
    pub already_linked: Vec<PathBuf>,
    /// Members that needed a link
    pub candidates: Vec<PathBuf>,
    /// Candidates actually linked (or that would be, in a dry run)
    pub linked: Vec<PathBuf>,
    /// Outcome for the group
    pub outcome: GroupOutcome,
}

impl GroupReport {
    fn new(plan: &LinkPlan, linked: Vec<PathBuf>, outcome: GroupOutcome) -> Self {
        Self {
            digest: plan.digest_hex(),
            size: plan.size,
            canonical_source: plan.canonical_source.clone(),
            already_linked: plan.already_linked.clone(),
            candidates: plan.candidates.clone(),
            linked,
            outcome,
        }
    }
}

/// A non-fatal per-file error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    /// File the error concerns
    pub path: PathBuf,
    /// Short error kind
    pub kind: String,
    /// Human-readable message including the OS reason
    pub message: String,
}

impl From<&HashError> for FileError {
    fn from(err: &HashError) -> Self {
        Self {
            path: err.path().to_path_buf(),
            kind: "hash".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<&LinkError> for FileError {
    fn from(err: &LinkError) -> Self {
        Self {
            path: err.path().to_path_buf(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Search root
    pub root: PathBuf,
    /// Target file name
    pub filename: String,
    /// Mode label (`interactive`, `automatic`, `dry-run`)
    pub mode: String,
    /// Counters
    pub stats: RunStats,
    /// Handled groups in order
    pub groups: Vec<GroupReport>,
    /// Per-file errors in order of occurrence
    pub errors: Vec<FileError>,
    /// Whether the run stopped early on user interrupt
    pub interrupted: bool,
}

impl RunReport {
    /// Start an empty report.
    #[must_use]
    pub fn new(root: &Path, filename: &str, mode: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            filename: filename.to_string(),
            mode: mode.to_string(),
            ..Self::default()
        }
    }

    /// Record a file that could not be hashed.
    pub fn record_hash_error(&mut self, err: &HashError) {
        self.stats.hash_errors += 1;
        self.errors.push(FileError::from(err));
    }

    /// Record a group the user declined.
    pub fn record_declined(&mut self, plan: &LinkPlan) {
        self.stats.groups_skipped += 1;
        self.stats.groups_declined += 1;
        self.stats.files_already_linked += plan.already_linked.len();
        self.groups
            .push(GroupReport::new(plan, Vec::new(), GroupOutcome::Declined));
    }

    /// Record a group whose members already share one inode.
    pub fn record_merged(&mut self, plan: &LinkPlan) {
        self.stats.groups_skipped += 1;
        self.stats.groups_merged += 1;
        self.stats.files_already_linked += plan.already_linked.len();
        self.groups
            .push(GroupReport::new(plan, Vec::new(), GroupOutcome::AlreadyMerged));
    }

    /// Record what a dry run would have done with a group.
    pub fn record_dry_run(&mut self, plan: &LinkPlan) -> GroupOutcome {
        self.stats.groups_created += 1;
        self.stats.links_created += plan.candidates.len();
        self.stats.files_already_linked += plan.already_linked.len();
        self.stats.bytes_linked += plan.reclaimable_bytes();
        self.groups.push(GroupReport::new(
            plan,
            plan.candidates.clone(),
            GroupOutcome::WouldLink,
        ));
        GroupOutcome::WouldLink
    }

    /// Record the executor's result for a group.
    pub fn record_executed(&mut self, plan: &LinkPlan, result: GroupLinkResult) -> GroupOutcome {
        let links = result.linked.len();
        self.stats.links_created += links;
        self.stats.bytes_linked += plan.size.saturating_mul(links as u64);
        self.stats.files_already_linked +=
            plan.already_linked.len() + result.already_linked.len();
        self.stats.link_errors += result.errors.len();
        self.errors
            .extend(result.errors.iter().map(FileError::from));

        let outcome = if links > 0 {
            self.stats.groups_created += 1;
            GroupOutcome::Linked
        } else if result.interrupted && result.errors.is_empty() {
            GroupOutcome::Interrupted
        } else if result.errors.is_empty() {
            self.stats.groups_skipped += 1;
            self.stats.groups_merged += 1;
            GroupOutcome::AlreadyMerged
        } else {
            GroupOutcome::Failed
        };

        self.groups
            .push(GroupReport::new(plan, result.linked, outcome));
        outcome
    }

    /// Final process status.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.interrupted {
            ExitCode::Interrupted
        } else if self.stats.errors() > 0 {
            ExitCode::Failure
        } else {
            ExitCode::Success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::InodeKey;

    fn plan(candidates: usize, already: usize) -> LinkPlan {
        LinkPlan {
            digest: [7; 32],
            size: 100,
            canonical_source: PathBuf::from("/r/a"),
            source_inode: InodeKey::new(1, 1),
            already_linked: (0..already).map(|i| PathBuf::from(format!("/r/l{}", i))).collect(),
            candidates: (0..candidates).map(|i| PathBuf::from(format!("/r/c{}", i))).collect(),
        }
    }

    #[test]
    fn test_dry_run_counts_like_automatic() {
        let plan = plan(2, 1);

        let mut dry = RunReport::new(Path::new("/r"), "x", "dry-run");
        dry.record_dry_run(&plan);

        let mut auto = RunReport::new(Path::new("/r"), "x", "automatic");
        auto.record_executed(
            &plan,
            GroupLinkResult {
                linked: plan.candidates.clone(),
                ..GroupLinkResult::default()
            },
        );

        assert_eq!(dry.stats, auto.stats);
        assert_eq!(dry.stats.links_created, 2);
        assert_eq!(dry.stats.bytes_linked, 200);
        assert_eq!(dry.stats.files_already_linked, 1);
    }

    #[test]
    fn test_declined_and_merged_are_skipped() {
        let mut report = RunReport::new(Path::new("/r"), "x", "interactive");
        report.record_declined(&plan(1, 0));
        report.record_merged(&plan(0, 2));

        assert_eq!(report.stats.groups_skipped, 2);
        assert_eq!(report.stats.groups_declined, 1);
        assert_eq!(report.stats.groups_merged, 1);
        assert_eq!(report.stats.files_already_linked, 2);
        assert_eq!(report.exit_code(), ExitCode::Success);
    }

    #[test]
    fn test_link_errors_fail_the_run() {
        let plan = plan(2, 0);
        let mut report = RunReport::new(Path::new("/r"), "x", "automatic");
        let outcome = report.record_executed(
            &plan,
            GroupLinkResult {
                linked: vec![plan.candidates[0].clone()],
                errors: vec![LinkError::SourceChanged(PathBuf::from("/r/a"))],
                ..GroupLinkResult::default()
            },
        );

        assert_eq!(outcome, GroupOutcome::Linked);
        assert_eq!(report.stats.groups_created, 1);
        assert_eq!(report.stats.link_errors, 1);
        assert_eq!(report.errors[0].kind, "source_changed");
        assert_eq!(report.exit_code(), ExitCode::Failure);
    }

    #[test]
    fn test_all_failed_group() {
        let plan = plan(1, 0);
        let mut report = RunReport::new(Path::new("/r"), "x", "automatic");
        let outcome = report.record_executed(
            &plan,
            GroupLinkResult {
                errors: vec![LinkError::SourceChanged(PathBuf::from("/r/a"))],
                ..GroupLinkResult::default()
            },
        );
        assert_eq!(outcome, GroupOutcome::Failed);
        assert_eq!(report.stats.groups_created, 0);
        assert_eq!(report.stats.groups_skipped, 0);
    }

    #[test]
    fn test_group_stopped_before_first_candidate_is_not_merged() {
        let plan = plan(2, 0);
        let mut report = RunReport::new(Path::new("/r"), "x", "automatic");
        let outcome = report.record_executed(
            &plan,
            GroupLinkResult {
                interrupted: true,
                ..GroupLinkResult::default()
            },
        );

        assert_eq!(outcome, GroupOutcome::Interrupted);
        assert_eq!(report.stats.groups_skipped, 0);
        assert_eq!(report.stats.groups_merged, 0);
        assert_eq!(report.stats.groups_created, 0);
        assert_eq!(report.groups[0].outcome, GroupOutcome::Interrupted);
    }

    #[test]
    fn test_partially_linked_interrupted_group_counts_as_linked() {
        let plan = plan(2, 0);
        let mut report = RunReport::new(Path::new("/r"), "x", "automatic");
        let outcome = report.record_executed(
            &plan,
            GroupLinkResult {
                linked: vec![plan.candidates[0].clone()],
                interrupted: true,
                ..GroupLinkResult::default()
            },
        );

        assert_eq!(outcome, GroupOutcome::Linked);
        assert_eq!(report.stats.groups_created, 1);
    }

    #[test]
    fn test_hash_errors_counted() {
        let mut report = RunReport::new(Path::new("/r"), "x", "automatic");
        report.record_hash_error(&HashError::NotFound(PathBuf::from("/r/gone")));
        assert_eq!(report.stats.errors(), 1);
        assert_eq!(report.errors[0].kind, "hash");
        assert_eq!(report.exit_code(), ExitCode::Failure);
    }

    #[test]
    fn test_interrupt_wins_over_errors() {
        let mut report = RunReport::new(Path::new("/r"), "x", "automatic");
        report.record_hash_error(&HashError::NotFound(PathBuf::from("/r/gone")));
        report.interrupted = true;
        assert_eq!(report.exit_code(), ExitCode::Interrupted);
    }

    #[test]
    fn test_report_serializes_outcome_snake_case() {
        let mut report = RunReport::new(Path::new("/r"), "x", "dry-run");
        report.record_merged(&plan(0, 1));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["groups"][0]["outcome"], "already_merged");
        assert_eq!(json["stats"]["groups_merged"], 1);
    }
}
