// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Similarity scoring: cosine kernel, Jaccard set overlap, and
//! tier classification of a candidate against a memory pool.

use std::collections::BTreeSet;

use engram_config::DedupConfig;
use engram_core::error::EngramError;
use engram_core::types::Memory;
use tracing::{debug, warn};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1]. A zero-magnitude vector yields `0.0`, never
/// a division error. Fails with `DimensionMismatch` on unequal lengths;
/// callers comparing whole pools must guard per record rather than
/// propagate the failure across the batch.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, EngramError> {
    if a.len() != b.len() {
        return Err(EngramError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())) as f32)
}

/// Jaccard overlap of two sets: `|A ∩ B| / |A ∪ B|`. Empty union yields 0.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Which similarity band a stored memory falls into relative to a candidate.
///
/// The bands are mutually exclusive, so an enum encodes that invariant
/// instead of a pair of boolean flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    /// At or above the duplicate threshold.
    Duplicate,
    /// In the merge band, below duplicate.
    Merge,
    /// In the related band, below merge.
    Related,
}

/// Classify a similarity score against the configured thresholds.
///
/// Returns `None` below the related threshold: such memories are excluded
/// from the decision entirely.
pub fn classify(score: f32, config: &DedupConfig) -> Option<MatchTier> {
    if score >= config.duplicate_threshold {
        Some(MatchTier::Duplicate)
    } else if score >= config.merge_threshold {
        Some(MatchTier::Merge)
    } else if score >= config.related_threshold {
        Some(MatchTier::Related)
    } else {
        None
    }
}

/// A stored memory compared against a candidate embedding.
#[derive(Debug, Clone)]
pub struct SimilarityMatch {
    pub memory: Memory,
    pub score: f32,
    pub tier: MatchTier,
}

/// Compare a candidate embedding against every memory in the pool.
///
/// Memories without an embedding are skipped, as are records whose vector
/// length does not match the candidate's (logged, never aborting the
/// batch). Results are classified into tiers and sorted descending by
/// score; sub-related memories are dropped.
pub fn rank_against_pool(
    candidate_embedding: &[f32],
    pool: Vec<Memory>,
    config: &DedupConfig,
) -> Vec<SimilarityMatch> {
    let mut matches: Vec<SimilarityMatch> = pool
        .into_iter()
        .filter_map(|memory| {
            let Some(embedding) = memory.embedding.as_deref() else {
                debug!(memory_id = %memory.id, "memory has no embedding, skipping comparison");
                return None;
            };
            let score = match cosine_similarity(candidate_embedding, embedding) {
                Ok(score) => score,
                Err(err) => {
                    warn!(memory_id = %memory.id, error = %err, "skipping malformed record");
                    return None;
                }
            };
            let tier = classify(score, config)?;
            Some(SimilarityMatch {
                memory,
                score,
                tier,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    matches
}
