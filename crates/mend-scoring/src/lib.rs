//! # mend-scoring
//!
//! File-aware diff similarity scoring for Mend.
//!
//! The scorer is both the success metric and the training reward signal:
//! it splits the oracle and generated unified diffs into per-file fragments,
//! compares matching files with a character-level sequence ratio, and
//! normalizes by the oracle file count.

mod diff;
mod similarity;

pub use diff::{fragment_path, fragments_by_path, split_by_files};
pub use similarity::{diff_similarity, file_match, sequence_ratio, RewardWeights};
