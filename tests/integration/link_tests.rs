#![cfg(unix)]

use rustlink::actions::{AlwaysConfirm, Driver, LinkError, LinkExecutor, RunMode, SilentObserver};
use rustlink::duplicates::{build_content_groups, plan_all, LinkPlan};
use rustlink::error::ExitCode;
use rustlink::report::{GroupOutcome, RunReport};
use rustlink::scanner::{Hasher, Scanner, ScannerConfig};
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use tempfile::tempdir;

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn plans_for(root: &Path, filename: &str) -> Vec<LinkPlan> {
    let outcome = Scanner::new(root, ScannerConfig::new(filename))
        .scan()
        .unwrap();
    let (records, errors) = Hasher::new().fingerprint_all(&outcome.entries, 1, None);
    assert!(errors.is_empty());
    let (groups, _) = build_content_groups(records);
    plan_all(&groups)
}

fn ino(path: &Path) -> u64 {
    fs::metadata(path).unwrap().ino()
}

#[test]
fn test_parallel_linking_of_many_candidates() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    for i in 0..24 {
        write(root, &format!("d{:02}/page.html", i), b"<html></html>");
    }

    let plans = plans_for(root, "page.html");
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].candidates.len(), 23);

    let result = LinkExecutor::new().with_jobs(4).link_plan(&plans[0], None);

    assert_eq!(result.link_count(), 23);
    assert!(result.all_succeeded());
    let source_inode = ino(&plans[0].canonical_source);
    for i in 0..24 {
        assert_eq!(ino(&root.join(format!("d{:02}/page.html", i))), source_inode);
    }
    assert_eq!(fs::metadata(&plans[0].canonical_source).unwrap().nlink(), 24);
}

#[test]
fn test_candidate_modified_after_planning_is_left_alone() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a/config.yml", b"same");
    write(root, "b/config.yml", b"same");
    write(root, "c/config.yml", b"same");

    let plans = plans_for(root, "config.yml");
    // Someone edits b between hashing and linking
    fs::write(root.join("b/config.yml"), b"edited by hand").unwrap();

    let mut report = RunReport::new(root, "config.yml", RunMode::Automatic.label());
    report.stats.total_files = 3;
    report.stats.groups_found = plans.len();
    Driver::new(RunMode::Automatic)
        .run(&plans, &mut AlwaysConfirm(true), &mut SilentObserver, &mut report)
        .unwrap();

    assert_eq!(report.stats.links_created, 1);
    assert_eq!(report.stats.link_errors, 1);
    assert_eq!(report.errors[0].kind, "modified");
    assert_eq!(report.groups[0].outcome, GroupOutcome::Linked);
    assert_eq!(report.exit_code(), ExitCode::Failure);
    assert_eq!(fs::read(root.join("b/config.yml")).unwrap(), b"edited by hand");
    assert_eq!(ino(&root.join("a/config.yml")), ino(&root.join("c/config.yml")));
}

#[test]
fn test_source_replaced_after_planning_fails_group() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a/config.yml", b"same");
    write(root, "b/config.yml", b"same");

    let plans = plans_for(root, "config.yml");
    let b_inode = ino(&root.join("b/config.yml"));
    // Replace the source with a new inode holding the same bytes
    fs::write(root.join("a/replacement"), b"same").unwrap();
    fs::rename(root.join("a/replacement"), root.join("a/config.yml")).unwrap();

    let result = LinkExecutor::new().link_plan(&plans[0], None);

    assert_eq!(result.link_count(), 0);
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(result.errors[0], LinkError::SourceChanged(_)));
    assert_eq!(ino(&root.join("b/config.yml")), b_inode);
}

#[test]
fn test_candidate_linked_by_someone_else_counts_as_already_linked() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a/config.yml", b"same");
    write(root, "b/config.yml", b"same");

    let plans = plans_for(root, "config.yml");
    fs::remove_file(root.join("b/config.yml")).unwrap();
    fs::hard_link(root.join("a/config.yml"), root.join("b/config.yml")).unwrap();

    let result = LinkExecutor::new().link_plan(&plans[0], None);

    assert_eq!(result.link_count(), 0);
    assert_eq!(result.already_linked.len(), 1);
    assert!(result.all_succeeded());
}

#[test]
fn test_linking_leaves_no_stray_files() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a/config.yml", b"same");
    write(root, "b/config.yml", b"same");

    let plans = plans_for(root, "config.yml");
    LinkExecutor::new().link_plan(&plans[0], None);

    let names: Vec<_> = fs::read_dir(root.join("b"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("config.yml")]);
}
