//! Link planning for content groups.
//!
//! Planning is a pure function of a [`ContentGroup`]: it never touches the
//! filesystem and never asks the user anything. Deciding whether a plan is
//! executed belongs to the driver loop in [`crate::actions::driver`].
//!
//! # Canonical source selection
//!
//! The canonical source is the first path of the first inode group, that is
//! the earliest-discovered physical file. Discovery order is the scanner's
//! sequence order (a walk sorted by file name). Selection is deliberately
//! *not* based on lexicographic full-path order, size, age or modification
//! time. It is deterministic for one filesystem state and otherwise arbitrary;
//! callers must not read "oldest" or "preferred" into it.

use std::path::PathBuf;

use serde::Serialize;

use super::groups::ContentGroup;
use crate::scanner::{hash_to_hex, Digest, InodeKey};

/// What to do with one content group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkPlan {
    /// Digest of the group
    #[serde(serialize_with = "serialize_digest")]
    pub digest: Digest,
    /// Content size in bytes
    pub size: u64,
    /// File every candidate will be linked to; never mutated
    pub canonical_source: PathBuf,
    /// Identity of the canonical source at hashing time
    pub source_inode: InodeKey,
    /// Other names of the canonical source's inode (nothing to do)
    pub already_linked: Vec<PathBuf>,
    /// Members on a different inode, in discovery order
    pub candidates: Vec<PathBuf>,
}

impl LinkPlan {
    /// Whether the group is already one physical file.
    #[must_use]
    pub fn is_merged(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Total number of members in the group.
    #[must_use]
    pub fn member_count(&self) -> usize {
        1 + self.already_linked.len() + self.candidates.len()
    }

    /// Digest as a hexadecimal string.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        hash_to_hex(&self.digest)
    }

    /// Bytes that become shared if every candidate is linked.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.size.saturating_mul(self.candidates.len() as u64)
    }
}

fn serialize_digest<S: serde::Serializer>(digest: &Digest, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&hash_to_hex(digest))
}

/// Build the plan for one group.
///
/// Returns `None` only for a group without inode groups, which
/// [`super::build_content_groups`] never produces.
#[must_use]
pub fn plan_group(group: &ContentGroup) -> Option<LinkPlan> {
    let first = group.inode_groups.first()?;
    let (canonical_source, already_linked) = first.paths.split_first()?;

    let candidates = group
        .files
        .iter()
        .filter(|file| file.inode != first.inode)
        .map(|file| file.path.clone())
        .collect::<Vec<_>>();

    Some(LinkPlan {
        digest: group.digest,
        size: group.size,
        canonical_source: canonical_source.clone(),
        source_inode: first.inode,
        already_linked: already_linked.to_vec(),
        candidates,
    })
}

/// Plan every group, preserving group order.
#[must_use]
pub fn plan_all(groups: &[ContentGroup]) -> Vec<LinkPlan> {
    groups.iter().filter_map(plan_group).collect()
}
