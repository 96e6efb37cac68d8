//! Content grouping and inode sub-partitioning.
//!
//! # Overview
//!
//! [`build_content_groups`] buckets hashed files by digest. Buckets keep the
//! order in which their digest first appeared, and members keep discovery
//! order. Buckets with a single member are dropped: one file is never a
//! duplicate of anything.
//!
//! Each surviving [`ContentGroup`] is further split into [`InodeGroup`]s,
//! ordered by first appearance inside the group. Members of one inode group
//! are already hard links of each other, which is detected from metadata
//! alone without reading content again.
//!
//! # Example
//!
//! ```
//! use rustlink::duplicates::build_content_groups;
//! use rustlink::scanner::{FileRecord, InodeKey};
//! use std::path::PathBuf;
//!
//! let records = vec![
//!     FileRecord::new(0, PathBuf::from("/r/a/config.yml"), 1, InodeKey::new(1, 10), [1; 32]),
//!     FileRecord::new(1, PathBuf::from("/r/b/config.yml"), 1, InodeKey::new(1, 11), [1; 32]),
//!     FileRecord::new(2, PathBuf::from("/r/c/config.yml"), 1, InodeKey::new(1, 12), [2; 32]),
//! ];
//!
//! let (groups, stats) = build_content_groups(records);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(stats.unique_files, 1);
//! assert_eq!(groups[0].inode_groups.len(), 2);
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::scanner::{hash_to_hex, Digest, FileRecord, InodeKey};

/// Paths inside one content group that share a physical file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InodeGroup {
    /// Shared identity
    pub inode: InodeKey,
    /// Paths in discovery order
    pub paths: Vec<PathBuf>,
}

/// Files with byte-identical content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentGroup {
    /// BLAKE3 digest shared by every member
    pub digest: Digest,
    /// Size of the first member
    pub size: u64,
    /// Members in discovery order (always two or more)
    pub files: Vec<FileRecord>,
    /// Members partitioned by inode, in order of first appearance
    pub inode_groups: Vec<InodeGroup>,
}

impl ContentGroup {
    fn from_records(files: Vec<FileRecord>) -> Self {
        let digest = files[0].digest;
        let size = files[0].size;
        let inode_groups = partition_by_inode(&files);
        Self {
            digest,
            size,
            files,
            inode_groups,
        }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the group has no members (never true for built groups).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Digest as a hexadecimal string.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        hash_to_hex(&self.digest)
    }
}

/// Counters produced while grouping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupingStats {
    /// Records handed to the grouper
    pub total_files: usize,
    /// Distinct digests seen
    pub distinct_digests: usize,
    /// Groups with two or more members
    pub content_groups: usize,
    /// Files inside those groups
    pub grouped_files: usize,
    /// Files whose content occurs only once
    pub unique_files: usize,
}

/// Bucket records by digest and drop singletons.
///
/// Records must already be in discovery order; the grouper never reorders
/// them.
#[must_use]
pub fn build_content_groups(records: Vec<FileRecord>) -> (Vec<ContentGroup>, GroupingStats) {
    let total_files = records.len();
    let mut index: HashMap<Digest, usize> = HashMap::with_capacity(records.len());
    let mut buckets: Vec<Vec<FileRecord>> = Vec::new();

    for record in records {
        match index.get(&record.digest) {
            Some(&slot) => buckets[slot].push(record),
            None => {
                index.insert(record.digest, buckets.len());
                buckets.push(vec![record]);
            }
        }
    }

    let distinct_digests = buckets.len();
    let groups: Vec<ContentGroup> = buckets
        .into_iter()
        .filter(|bucket| bucket.len() > 1)
        .map(ContentGroup::from_records)
        .collect();

    let grouped_files = groups.iter().map(ContentGroup::len).sum();
    let stats = GroupingStats {
        total_files,
        distinct_digests,
        content_groups: groups.len(),
        grouped_files,
        unique_files: total_files - grouped_files,
    };

    log::debug!(
        "Grouping: {} files, {} distinct digests, {} groups",
        stats.total_files,
        stats.distinct_digests,
        stats.content_groups
    );

    (groups, stats)
}

/// Split members by inode, keeping first-appearance order.
fn partition_by_inode(files: &[FileRecord]) -> Vec<InodeGroup> {
    let mut index: HashMap<InodeKey, usize> = HashMap::new();
    let mut groups: Vec<InodeGroup> = Vec::new();

    for file in files {
        match index.get(&file.inode) {
            Some(&slot) => groups[slot].paths.push(file.path.clone()),
            None => {
                index.insert(file.inode, groups.len());
                groups.push(InodeGroup {
                    inode: file.inode,
                    paths: vec![file.path.clone()],
                });
            }
        }
    }

    groups
}
