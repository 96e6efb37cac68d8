use clap::Parser;
use rustlink::actions::{AlwaysConfirm, Driver, RunMode, SilentObserver};
use rustlink::cli::Cli;
use rustlink::duplicates::{build_content_groups, plan_all};
use rustlink::error::ExitCode;
use rustlink::report::{GroupOutcome, RunReport};
use rustlink::scanner::{Hasher, Scanner, ScannerConfig};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

/// Points between pipeline stages where a test may change the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Scanned,
    Planned,
}

/// Run scan, hash, group, plan and drive on `root` the way `run_app` does.
fn run_pipeline(root: &Path, filename: &str, mode: RunMode, accept: bool) -> RunReport {
    run_pipeline_with(root, filename, mode, accept, |_| {})
}

/// Like [`run_pipeline`], calling `between` after scanning and after planning.
fn run_pipeline_with(
    root: &Path,
    filename: &str,
    mode: RunMode,
    accept: bool,
    mut between: impl FnMut(Stage),
) -> RunReport {
    let scan = Scanner::new(root, ScannerConfig::new(filename))
        .scan()
        .unwrap();
    between(Stage::Scanned);
    let (records, errors) = Hasher::new().fingerprint_all(&scan.entries, 1, None);

    let mut report = RunReport::new(&scan.root, filename, mode.label());
    report.stats.total_files = scan.entries.len();
    for err in &errors {
        report.record_hash_error(err);
    }

    let (groups, _) = build_content_groups(records);
    report.stats.groups_found = groups.len();
    let plans = plan_all(&groups);
    between(Stage::Planned);

    Driver::new(mode)
        .run(
            &plans,
            &mut AlwaysConfirm(accept),
            &mut SilentObserver,
            &mut report,
        )
        .unwrap();
    report
}

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[cfg(unix)]
fn ino(path: &Path) -> u64 {
    fs::metadata(path).unwrap().ino()
}

#[cfg(unix)]
fn nlink(path: &Path) -> u64 {
    fs::metadata(path).unwrap().nlink()
}

#[test]
#[cfg(unix)]
fn test_three_copies_two_identical() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a/config.yml", b"x\n");
    write(root, "b/config.yml", b"x\n");
    write(root, "c/config.yml", b"y\n");
    let c_inode = ino(&root.join("c/config.yml"));

    let report = run_pipeline(root, "config.yml", RunMode::Automatic, true);

    assert_eq!(report.stats.total_files, 3);
    assert_eq!(report.stats.groups_found, 1);
    assert_eq!(report.stats.groups_created, 1);
    assert_eq!(report.stats.links_created, 1);
    assert_eq!(report.stats.errors(), 0);
    assert_eq!(report.exit_code(), ExitCode::Success);

    assert_eq!(ino(&root.join("a/config.yml")), ino(&root.join("b/config.yml")));
    assert_eq!(nlink(&root.join("a/config.yml")), 2);
    assert_eq!(ino(&root.join("c/config.yml")), c_inode);
    assert_eq!(fs::read(root.join("b/config.yml")).unwrap(), b"x\n");
}

#[test]
#[cfg(unix)]
fn test_canonical_source_is_first_discovered() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a/config.yml", b"same");
    write(root, "b/config.yml", b"same");
    write(root, "c/config.yml", b"same");
    let a_inode = ino(&root.join("a/config.yml"));

    let report = run_pipeline(root, "config.yml", RunMode::Automatic, true);

    assert_eq!(report.stats.links_created, 2);
    assert!(report.groups[0].canonical_source.ends_with("a/config.yml"));
    for name in ["a", "b", "c"] {
        assert_eq!(ino(&root.join(name).join("config.yml")), a_inode);
    }
}

#[test]
#[cfg(unix)]
fn test_second_run_is_idempotent() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "one/_quarto.yml", b"project: site\n");
    write(root, "two/_quarto.yml", b"project: site\n");
    write(root, "three/_quarto.yml", b"project: site\n");

    let first = run_pipeline(root, "_quarto.yml", RunMode::Automatic, true);
    assert_eq!(first.stats.links_created, 2);

    let second = run_pipeline(root, "_quarto.yml", RunMode::Automatic, true);
    assert_eq!(second.stats.groups_found, 1);
    assert_eq!(second.stats.links_created, 0);
    assert_eq!(second.stats.groups_created, 0);
    assert_eq!(second.stats.groups_merged, 1);
    assert_eq!(second.stats.files_already_linked, 2);
    assert_eq!(second.groups[0].outcome, GroupOutcome::AlreadyMerged);
}

#[test]
#[cfg(unix)]
fn test_partially_linked_group_links_only_outsiders() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a/config.yml", b"shared");
    fs::create_dir_all(root.join("b")).unwrap();
    fs::hard_link(root.join("a/config.yml"), root.join("b/config.yml")).unwrap();
    write(root, "c/config.yml", b"shared");

    let report = run_pipeline(root, "config.yml", RunMode::Automatic, true);

    assert_eq!(report.stats.links_created, 1);
    assert_eq!(report.stats.files_already_linked, 1);
    assert_eq!(report.groups[0].candidates.len(), 1);
    assert!(report.groups[0].candidates[0].ends_with("c/config.yml"));
    assert_eq!(nlink(&root.join("a/config.yml")), 3);
}

#[test]
#[cfg(unix)]
fn test_dry_run_changes_nothing() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a/settings.json", b"{}");
    write(root, "b/settings.json", b"{}");
    write(root, "c/settings.json", b"{}");
    let before: Vec<(u64, u64)> = ["a", "b", "c"]
        .iter()
        .map(|d| {
            let p = root.join(d).join("settings.json");
            (ino(&p), nlink(&p))
        })
        .collect();

    let report = run_pipeline(root, "settings.json", RunMode::DryRun, true);

    assert_eq!(report.mode, "dry-run");
    assert_eq!(report.stats.groups_created, 1);
    assert_eq!(report.stats.links_created, 2);
    assert_eq!(report.groups[0].outcome, GroupOutcome::WouldLink);

    let after: Vec<(u64, u64)> = ["a", "b", "c"]
        .iter()
        .map(|d| {
            let p = root.join(d).join("settings.json");
            (ino(&p), nlink(&p))
        })
        .collect();
    assert_eq!(before, after);
}

#[test]
#[cfg(unix)]
fn test_declined_groups_are_untouched() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a/config.yml", b"same");
    write(root, "b/config.yml", b"same");
    let b_inode = ino(&root.join("b/config.yml"));

    let report = run_pipeline(root, "config.yml", RunMode::Interactive, false);

    assert_eq!(report.stats.groups_declined, 1);
    assert_eq!(report.stats.groups_skipped, 1);
    assert_eq!(report.stats.links_created, 0);
    assert_eq!(ino(&root.join("b/config.yml")), b_inode);
}

#[test]
#[cfg(unix)]
fn test_groups_never_mix_content() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "p/index.md", b"alpha");
    write(root, "q/index.md", b"beta");
    write(root, "r/index.md", b"alpha");
    write(root, "s/index.md", b"beta");
    write(root, "t/index.md", b"gamma");

    let report = run_pipeline(root, "index.md", RunMode::Automatic, true);

    assert_eq!(report.stats.groups_found, 2);
    assert_eq!(report.stats.links_created, 2);
    assert_eq!(ino(&root.join("p/index.md")), ino(&root.join("r/index.md")));
    assert_eq!(ino(&root.join("q/index.md")), ino(&root.join("s/index.md")));
    assert_ne!(ino(&root.join("p/index.md")), ino(&root.join("q/index.md")));
    assert_eq!(nlink(&root.join("t/index.md")), 1);
    assert_eq!(fs::read(root.join("s/index.md")).unwrap(), b"beta");
}

#[test]
#[cfg(unix)]
fn test_file_gone_before_hashing_fails_run_but_others_link() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a1/config.yml", b"alpha");
    write(root, "a2/config.yml", b"beta");
    write(root, "a3/config.yml", b"alpha");
    write(root, "a4/config.yml", b"beta");
    write(root, "a5/config.yml", b"alpha");

    let report = run_pipeline_with(root, "config.yml", RunMode::Automatic, true, |stage| {
        if stage == Stage::Scanned {
            fs::remove_file(root.join("a5/config.yml")).unwrap();
        }
    });

    assert_eq!(report.stats.total_files, 5);
    assert_eq!(report.stats.hash_errors, 1);
    assert_eq!(report.errors[0].kind, "hash");
    assert!(report.errors[0].path.ends_with("a5/config.yml"));
    assert_eq!(report.stats.groups_created, 2);
    assert_eq!(report.stats.links_created, 2);
    assert_eq!(report.exit_code(), ExitCode::Failure);
    assert_eq!(ino(&root.join("a1/config.yml")), ino(&root.join("a3/config.yml")));
    assert_eq!(ino(&root.join("a2/config.yml")), ino(&root.join("a4/config.yml")));
}

#[test]
#[cfg(unix)]
fn test_candidate_gone_before_linking_fails_run_but_others_link() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a1/config.yml", b"alpha");
    write(root, "a2/config.yml", b"beta");
    write(root, "a3/config.yml", b"alpha");
    write(root, "a4/config.yml", b"beta");

    let report = run_pipeline_with(root, "config.yml", RunMode::Automatic, true, |stage| {
        if stage == Stage::Planned {
            fs::remove_file(root.join("a3/config.yml")).unwrap();
        }
    });

    assert_eq!(report.stats.groups_found, 2);
    assert_eq!(report.stats.link_errors, 1);
    assert_eq!(report.errors[0].kind, "candidate_unavailable");
    assert_eq!(report.groups[0].outcome, GroupOutcome::Failed);
    assert_eq!(report.groups[1].outcome, GroupOutcome::Linked);
    assert_eq!(report.stats.groups_created, 1);
    assert_eq!(report.exit_code(), ExitCode::Failure);
    assert!(!root.join("a3/config.yml").exists());
    assert_eq!(ino(&root.join("a2/config.yml")), ino(&root.join("a4/config.yml")));
}

#[test]
fn test_unique_content_has_no_groups() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a/config.yml", b"1");
    write(root, "b/config.yml", b"2");

    let report = run_pipeline(root, "config.yml", RunMode::Automatic, true);

    assert_eq!(report.stats.total_files, 2);
    assert_eq!(report.stats.groups_found, 0);
    assert!(report.groups.is_empty());
    assert_eq!(report.exit_code(), ExitCode::Success);
}

#[test]
fn test_no_matching_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/other.yml", b"1");

    let report = run_pipeline(dir.path(), "config.yml", RunMode::Automatic, true);

    assert_eq!(report.stats.total_files, 0);
    assert_eq!(report.stats.groups_found, 0);
}

// =============================================================================
// run_app
// =============================================================================

#[test]
#[cfg(unix)]
fn test_run_app_auto_links() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a/config.yml", b"x\n");
    write(root, "b/config.yml", b"x\n");
    write(root, "c/config.yml", b"y\n");

    let cli = Cli::try_parse_from([
        "rustlink",
        "config.yml",
        "--root",
        root.to_str().unwrap(),
        "--auto",
        "--quiet",
        "--plain",
        "--no-color",
    ])
    .unwrap();
    let code = rustlink::run_app(cli).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(ino(&root.join("a/config.yml")), ino(&root.join("b/config.yml")));
    assert_ne!(ino(&root.join("a/config.yml")), ino(&root.join("c/config.yml")));
}

#[test]
#[cfg(unix)]
fn test_run_app_dry_run_json_with_jobs() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a/config.yml", b"x\n");
    write(root, "b/config.yml", b"x\n");
    let b_inode = ino(&root.join("b/config.yml"));

    let cli = Cli::try_parse_from([
        "rustlink",
        "config.yml",
        "--root",
        root.to_str().unwrap(),
        "--dry-run",
        "--jobs",
        "2",
        "--output",
        "json",
        "--quiet",
    ])
    .unwrap();
    let code = rustlink::run_app(cli).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(ino(&root.join("b/config.yml")), b_inode);
}

#[test]
fn test_run_app_missing_root_is_fatal() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope");

    let cli = Cli::try_parse_from([
        "rustlink",
        "config.yml",
        "--root",
        missing.to_str().unwrap(),
        "--auto",
        "--quiet",
    ])
    .unwrap();
    let err = rustlink::run_app(cli).unwrap_err();
    assert!(format!("{:#}", err).contains("nope"));
}

#[test]
fn test_run_app_excluded_root_children_are_skipped() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "docs/config.yml", b"same");
    write(root, "node_modules/pkg/config.yml", b"same");

    let cli = Cli::try_parse_from([
        "rustlink",
        "config.yml",
        "--root",
        root.to_str().unwrap(),
        "--auto",
        "--quiet",
        "--exclude",
        "node_modules",
    ])
    .unwrap();
    assert_eq!(rustlink::run_app(cli).unwrap(), ExitCode::Success);

    // Only one file was visible, so nothing was linked
    #[cfg(unix)]
    assert_eq!(nlink(&root.join("docs/config.yml")), 1);
}
