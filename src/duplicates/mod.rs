//! Duplicate detection and link planning.
//!
//! This module provides functionality for:
//! - Grouping hashed files by content digest
//! - Detecting members that are already hard links of each other
//! - Planning which members must be turned into links

pub mod groups;
pub mod planner;

pub use groups::{build_content_groups, ContentGroup, GroupingStats, InodeGroup};
pub use planner::{plan_all, plan_group, LinkPlan};
