use rustlink::duplicates::build_content_groups;
use rustlink::scanner::{Hasher, Scanner, ScannerConfig};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn defaults() -> Vec<String> {
    rustlink::config::DEFAULT_EXCLUDES
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let outcome = Scanner::new(dir.path(), ScannerConfig::new("config.yml"))
        .scan()
        .unwrap();

    assert!(outcome.entries.is_empty());
    assert!(!outcome.interrupted);
}

#[test]
fn test_default_exclusions_apply_at_top_level_only() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "config.yml", b"root");
    write(root, ".git/config.yml", b"git");
    write(root, "_site/config.yml", b"site");
    write(root, "project/config.yml", b"project");
    write(root, "project/_site/config.yml", b"nested site");

    let config = ScannerConfig::new("config.yml").with_excluded(defaults());
    let outcome = Scanner::new(root, config).scan().unwrap();

    let found: Vec<_> = outcome
        .entries
        .iter()
        .map(|e| e.path.strip_prefix(&outcome.root).unwrap().to_path_buf())
        .collect();
    assert_eq!(found.len(), 3);
    assert!(found.iter().any(|p| p == Path::new("config.yml")));
    assert!(found.iter().any(|p| p == Path::new("project/config.yml")));
    assert!(found.iter().any(|p| p == Path::new("project/_site/config.yml")));
}

#[test]
fn test_nested_exclusions_prune_every_level() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "project/config.yml", b"project");
    write(root, "project/_site/config.yml", b"nested site");
    write(root, "deep/er/node_modules/x/config.yml", b"module");

    let config = ScannerConfig::new("config.yml")
        .with_excluded(defaults())
        .with_exclude_nested(true);
    let outcome = Scanner::new(root, config).scan().unwrap();

    assert_eq!(outcome.entries.len(), 1);
    assert!(outcome.entries[0].path.ends_with("project/config.yml"));
}

#[test]
fn test_empty_exclusion_list_searches_everywhere() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, ".git/config.yml", b"git");
    write(root, "node_modules/config.yml", b"module");

    let config = ScannerConfig::new("config.yml").with_excluded(Vec::new());
    let outcome = Scanner::new(root, config).scan().unwrap();

    assert_eq!(outcome.entries.len(), 2);
}

#[test]
fn test_match_is_case_sensitive() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a/Config.yml", b"upper");
    write(root, "b/config.yml", b"lower");
    write(root, "c/config.yml.bak", b"backup");

    let outcome = Scanner::new(root, ScannerConfig::new("config.yml"))
        .scan()
        .unwrap();

    assert_eq!(outcome.entries.len(), 1);
    assert!(outcome.entries[0].path.ends_with("b/config.yml"));
}

#[test]
fn test_hash_then_group_uses_content_not_name_or_place() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "x/notes.txt", b"hello");
    write(root, "y/z/notes.txt", b"hello");
    write(root, "w/notes.txt", b"hello!");

    let outcome = Scanner::new(root, ScannerConfig::new("notes.txt"))
        .scan()
        .unwrap();
    let (records, errors) = Hasher::new().fingerprint_all(&outcome.entries, 2, None);
    assert!(errors.is_empty());
    assert_eq!(records.len(), 3);

    let (groups, stats) = build_content_groups(records);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].files.len(), 2);
    assert_eq!(stats.unique_files, 1);
    assert!(groups[0].files.iter().all(|f| f.size == 5));
}

#[test]
#[cfg(unix)]
fn test_unreadable_file_is_a_hash_error_not_fatal() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a/config.yml", b"same");
    write(root, "b/config.yml", b"same");
    write(root, "c/config.yml", b"same");
    let locked = root.join("c/config.yml");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root can read anything; nothing to test then
    if fs::read(&locked).is_ok() {
        return;
    }

    let outcome = Scanner::new(root, ScannerConfig::new("config.yml"))
        .scan()
        .unwrap();
    let (records, errors) = Hasher::new().fingerprint_all(&outcome.entries, 1, None);

    assert_eq!(outcome.entries.len(), 3);
    assert_eq!(records.len(), 2);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].path().ends_with("c/config.yml"));

    let (groups, _) = build_content_groups(records);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].files.len(), 2);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}
