//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based file grouping and the duplicate filter
//! - Content-hash narrowing of size candidates
//! - Bytewise verification of hash candidates
//! - The worker pools and pipeline tying the stages together

pub mod finder;
pub mod groups;
pub mod hash_stage;
pub mod stage;
pub mod verify;

pub use finder::{DuplicateFinder, FinderConfig, FinderError, ScanSummary};
pub use groups::{filter_duplicates, group_by_size, split_empty, CandidateGroup, GroupingStats, GroupingTable};
pub use hash_stage::{hash_group, HashStage};
pub use stage::WorkerPool;
pub use verify::{verify_group, verify_group_within, ByteVerifyStage};
