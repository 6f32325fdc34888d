//! Diff similarity scoring
//!
//! Compares a generated diff against the oracle (ground-truth) diff,
//! file by file. The final score is normalized by the number of *oracle*
//! files: a generated diff that touches many irrelevant files cannot dilute
//! the denominator, which closes off the reward-hacking strategy of diffing
//! unrelated files to inflate overlap.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use similar::TextDiff;
use tracing::debug;

use crate::diff::{fragment_path, fragments_by_path, split_by_files};

/// Character-level sequence similarity in [0, 1].
///
/// 0.0 for wholly dissimilar text, 1.0 for identical text; symmetric in
/// content. This is the longest-common-subsequence-style ratio
/// (`2 * matches / (len_a + len_b)`).
pub fn sequence_ratio(a: &str, b: &str) -> f32 {
    TextDiff::from_chars(a, b).ratio()
}

/// Similarity of a generated diff to an oracle diff, in [0, 1].
///
/// - Empty oracle: 1.0 if the generated diff is also empty, else 0.0.
/// - Empty generated diff against a non-empty oracle: 0.0.
/// - Otherwise: for every file in the oracle, the character-level ratio of
///   the two fragments if the generated diff touches the same file, else
///   0.0; summed and divided by the oracle file count.
pub fn diff_similarity(oracle: &str, generated: &str) -> f32 {
    if oracle.trim().is_empty() {
        return if generated.trim().is_empty() { 1.0 } else { 0.0 };
    }
    if generated.trim().is_empty() {
        return 0.0;
    }

    let oracle_files = fragments_by_path(oracle);
    let generated_files = fragments_by_path(generated);

    if oracle_files.is_empty() {
        return 0.0;
    }

    let mut total = 0.0;
    for (path, oracle_fragment) in &oracle_files {
        match generated_files.get(path) {
            Some(generated_fragment) => {
                let ratio = sequence_ratio(oracle_fragment, generated_fragment);
                debug!("File {} similarity: {:.3}", path, ratio);
                total += ratio;
            }
            None => {
                debug!("File {} not touched by generated diff", path);
            }
        }
    }

    total / oracle_files.len() as f32
}

/// Fraction of oracle files that the generated diff touches at all, in
/// [0, 1]. A coarser signal than [`diff_similarity`], normalized the same
/// way (by oracle file count only).
pub fn file_match(oracle: &str, generated: &str) -> f32 {
    if oracle.trim().is_empty() {
        return if generated.trim().is_empty() { 1.0 } else { 0.0 };
    }
    if generated.trim().is_empty() {
        return 0.0;
    }

    let oracle_paths: HashSet<&str> = split_by_files(oracle)
        .into_iter()
        .map(|fragment| fragment_path(fragment).unwrap_or(""))
        .collect();
    let generated_paths: HashSet<&str> = split_by_files(generated)
        .into_iter()
        .map(|fragment| fragment_path(fragment).unwrap_or(""))
        .collect();

    if oracle_paths.is_empty() {
        return 0.0;
    }

    let hits = oracle_paths.intersection(&generated_paths).count();
    hits as f32 / oracle_paths.len() as f32
}

/// Weights for the combined training reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardWeights {
    /// Weight of the main-patch similarity (default 0.5)
    pub similarity: f32,
    /// Weight of the file-overlap fraction (default 0.3)
    pub file_match: f32,
    /// Weight of the test-patch similarity (default 0.2)
    pub test_similarity: f32,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            similarity: 0.5,
            file_match: 0.3,
            test_similarity: 0.2,
        }
    }
}

impl RewardWeights {
    /// Weighted combination of the individual scores (each in [0, 1]).
    pub fn calculate(&self, similarity: f32, file_match: f32, test_similarity: f32) -> f32 {
        self.similarity * similarity
            + self.file_match * file_match
            + self.test_similarity * test_similarity
    }
}
