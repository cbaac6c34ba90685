// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model with documented defaults.
//!
//! Every threshold and weight the engine uses lives here as an explicit,
//! overridable value; the decision code never hardcodes a cutoff.

use serde::{Deserialize, Serialize};

/// Top-level Engram configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngramConfig {
    /// Deduplication engine settings.
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Selective-context scoring settings.
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Semantic compression settings.
    #[serde(default)]
    pub compression: CompressionConfig,
}

/// Deduplication thresholds and limits.
///
/// The three similarity thresholds are strictly ordered:
/// `duplicate_threshold > merge_threshold > related_threshold`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DedupConfig {
    /// Cosine similarity at or above which a candidate is a duplicate.
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f32,

    /// Cosine similarity at or above which a candidate should merge.
    #[serde(default = "default_merge_threshold")]
    pub merge_threshold: f32,

    /// Cosine similarity at or above which a memory is reported as related.
    #[serde(default = "default_related_threshold")]
    pub related_threshold: f32,

    /// Content is truncated to this many characters before embedding.
    #[serde(default = "default_max_embed_chars")]
    pub max_embed_chars: usize,

    /// Deadline for a single embedding call, in seconds. On expiry the
    /// engine takes the same degrade-to-insert path as any other
    /// embedding failure.
    #[serde(default = "default_embed_timeout_secs")]
    pub embed_timeout_secs: u64,

    /// A duplicate candidate whose content exceeds the existing content
    /// length by this ratio counts as carrying additional context.
    #[serde(default = "default_added_context_ratio")]
    pub added_context_ratio: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: default_duplicate_threshold(),
            merge_threshold: default_merge_threshold(),
            related_threshold: default_related_threshold(),
            max_embed_chars: default_max_embed_chars(),
            embed_timeout_secs: default_embed_timeout_secs(),
            added_context_ratio: default_added_context_ratio(),
        }
    }
}

fn default_duplicate_threshold() -> f32 {
    0.95
}

fn default_merge_threshold() -> f32 {
    0.85
}

fn default_related_threshold() -> f32 {
    0.70
}

fn default_max_embed_chars() -> usize {
    8000
}

fn default_embed_timeout_secs() -> u64 {
    10
}

fn default_added_context_ratio() -> f64 {
    1.2
}

/// Selective-context scoring weights and bounds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionConfig {
    /// Relevance term weights. Must sum to 1.0.
    #[serde(default)]
    pub weights: SelectionWeights,

    /// Lower clamp for the dynamic inclusion threshold.
    #[serde(default = "default_threshold_floor")]
    pub threshold_floor: f64,

    /// Upper clamp for the dynamic inclusion threshold.
    #[serde(default = "default_threshold_ceiling")]
    pub threshold_ceiling: f64,

    /// Characteristic time of the recency exponential decay, in days.
    #[serde(default = "default_recency_decay_days")]
    pub recency_decay_days: f64,

    /// Default token budget for assembled context.
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            weights: SelectionWeights::default(),
            threshold_floor: default_threshold_floor(),
            threshold_ceiling: default_threshold_ceiling(),
            recency_decay_days: default_recency_decay_days(),
            token_budget: default_token_budget(),
        }
    }
}

fn default_threshold_floor() -> f64 {
    0.5
}

fn default_threshold_ceiling() -> f64 {
    0.8
}

fn default_recency_decay_days() -> f64 {
    30.0
}

fn default_token_budget() -> usize {
    4000
}

/// Per-term weights for the composite relevance score.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionWeights {
    /// Cosine similarity against the query embedding.
    #[serde(default = "default_semantic_weight")]
    pub semantic: f64,

    /// Keyword overlap between query and memory content.
    #[serde(default = "default_lexical_weight")]
    pub lexical: f64,

    /// Stored importance of the memory.
    #[serde(default = "default_importance_weight")]
    pub importance: f64,

    /// Exponential recency decay.
    #[serde(default = "default_recency_weight")]
    pub recency: f64,

    /// Fraction of the memory's entities mentioned in the query.
    #[serde(default = "default_entity_weight")]
    pub entity: f64,
}

impl Default for SelectionWeights {
    fn default() -> Self {
        Self {
            semantic: default_semantic_weight(),
            lexical: default_lexical_weight(),
            importance: default_importance_weight(),
            recency: default_recency_weight(),
            entity: default_entity_weight(),
        }
    }
}

impl SelectionWeights {
    /// Sum of all term weights.
    pub fn total(&self) -> f64 {
        self.semantic + self.lexical + self.importance + self.recency + self.entity
    }
}

fn default_semantic_weight() -> f64 {
    0.40
}

fn default_lexical_weight() -> f64 {
    0.20
}

fn default_importance_weight() -> f64 {
    0.15
}

fn default_recency_weight() -> f64 {
    0.15
}

fn default_entity_weight() -> f64 {
    0.10
}

/// Semantic compression settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompressionConfig {
    /// Fraction of the token budget available to the compressor; the rest
    /// is a reserved buffer so the output never overruns the budget.
    #[serde(default = "default_budget_ratio")]
    pub budget_ratio: f64,

    /// Sentence fragments shorter than this are discarded during splitting.
    #[serde(default = "default_min_sentence_chars")]
    pub min_sentence_chars: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            budget_ratio: default_budget_ratio(),
            min_sentence_chars: default_min_sentence_chars(),
        }
    }
}

fn default_budget_ratio() -> f64 {
    0.9
}

fn default_min_sentence_chars() -> usize {
    20
}
