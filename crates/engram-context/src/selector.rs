// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Selective context: multi-factor relevance scoring of a memory pool
//! against a query, with a dynamically computed inclusion threshold.
//!
//! The cutoff adapts to how concentrated or dispersed the scores are for
//! this particular query instead of using one fixed threshold for every
//! query shape. If the query cannot be embedded, scoring degrades to the
//! lexical/importance/recency/entity terms with renormalized weights.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use engram_config::SelectionConfig;
use engram_core::traits::EmbeddingProvider;
use engram_core::types::Memory;
use engram_memory::cosine_similarity;
use tracing::{debug, warn};

use crate::tokens::estimate_tokens;

/// A memory with its composite relevance score for one query.
#[derive(Debug, Clone)]
pub struct ScoredMemory {
    pub memory: Memory,
    pub score: f64,
}

/// Output of the selection pass, before any compression.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Selected memories, descending by relevance.
    pub memories: Vec<ScoredMemory>,
    /// Timestamp-prefixed lines joined with blank lines.
    pub content: String,
    /// Sum of the per-line token estimates of the selected set.
    pub total_tokens: usize,
    pub selected_count: usize,
}

impl SelectionResult {
    fn empty() -> Self {
        Self {
            memories: Vec::new(),
            content: String::new(),
            total_tokens: 0,
            selected_count: 0,
        }
    }
}

/// Scores a memory pool against a query and selects the relevant subset.
pub struct SelectiveContext {
    embedder: Arc<dyn EmbeddingProvider>,
    config: SelectionConfig,
}

impl SelectiveContext {
    /// Creates a new selector over the injected embedding provider.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, config: SelectionConfig) -> Self {
        Self { embedder, config }
    }

    /// Select the memories relevant to `query` from `pool`.
    ///
    /// Never fails: an embedding outage drops the semantic term and
    /// renormalizes the remaining weights, so retrieval stays best-effort.
    pub async fn select(&self, pool: &[Memory], query: &str) -> SelectionResult {
        if pool.is_empty() {
            return SelectionResult::empty();
        }

        let query_embedding = match self.embedder.embed(query).await {
            Ok(vector) => Some(vector),
            Err(err) => {
                warn!(error = %err, "query embedding failed, falling back to lexical scoring");
                None
            }
        };

        let query_tokens = tokenize(&query.to_lowercase());
        let now = Utc::now();

        let scores: Vec<f64> = pool
            .iter()
            .map(|memory| self.relevance(memory, query_embedding.as_deref(), &query_tokens, now))
            .collect();

        let threshold = dynamic_threshold(
            &scores,
            self.config.threshold_floor,
            self.config.threshold_ceiling,
        );
        debug!(threshold, pool = pool.len(), "selection threshold computed");

        let mut selected: Vec<ScoredMemory> = pool
            .iter()
            .zip(scores.iter())
            .filter(|(_, score)| **score >= threshold)
            .map(|(memory, score)| ScoredMemory {
                memory: memory.clone(),
                score: *score,
            })
            .collect();
        selected.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let lines: Vec<String> = selected.iter().map(|s| format_line(&s.memory)).collect();
        let total_tokens = lines.iter().map(|line| estimate_tokens(line)).sum();
        let selected_count = selected.len();

        SelectionResult {
            memories: selected,
            content: lines.join("\n\n"),
            total_tokens,
            selected_count,
        }
    }

    /// Composite relevance of one memory. Each term is clamped to [0, 1]
    /// before weighting; the final score is capped at 1.0.
    fn relevance(
        &self,
        memory: &Memory,
        query_embedding: Option<&[f32]>,
        query_tokens: &BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> f64 {
        let w = &self.config.weights;

        let lexical = lexical_overlap(query_tokens, &memory.content);
        let importance = memory.metadata.importance.clamp(0.0, 1.0);
        let recency = recency_score(memory.metadata.timestamp, now, self.config.recency_decay_days);
        let entity = entity_relevance(&memory.metadata.entities, query_tokens);

        let score = match query_embedding {
            Some(query_embedding) => {
                let semantic = semantic_score(query_embedding, memory);
                w.semantic * semantic
                    + w.lexical * lexical
                    + w.importance * importance
                    + w.recency * recency
                    + w.entity * entity
            }
            None => {
                // Semantic term unavailable: renormalize so the remaining
                // weights still sum to 1.
                let remaining = w.lexical + w.importance + w.recency + w.entity;
                if remaining <= 0.0 {
                    return 0.0;
                }
                (w.lexical * lexical
                    + w.importance * importance
                    + w.recency * recency
                    + w.entity * entity)
                    / remaining
            }
        };

        score.min(1.0)
    }
}

/// Cosine similarity against the query, clamped to [0, 1]. A memory
/// without an embedding, or with mismatched dimensions, contributes zero
/// rather than aborting the scoring pass.
fn semantic_score(query_embedding: &[f32], memory: &Memory) -> f64 {
    let Some(embedding) = memory.embedding.as_deref() else {
        return 0.0;
    };
    match cosine_similarity(query_embedding, embedding) {
        Ok(similarity) => f64::from(similarity).clamp(0.0, 1.0),
        Err(err) => {
            warn!(memory_id = %memory.id, error = %err, "skipping semantic term for malformed record");
            0.0
        }
    }
}

/// Fraction of query tokens present in the memory content.
fn lexical_overlap(query_tokens: &BTreeSet<String>, content: &str) -> f64 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let memory_tokens = tokenize(&content.to_lowercase());
    let hits = query_tokens.intersection(&memory_tokens).count();
    (hits as f64 / query_tokens.len() as f64).clamp(0.0, 1.0)
}

/// Exponential recency decay with the configured characteristic time.
fn recency_score(timestamp: DateTime<Utc>, now: DateTime<Utc>, decay_days: f64) -> f64 {
    let age_days = ((now - timestamp).num_seconds() as f64 / 86_400.0).max(0.0);
    (-age_days / decay_days).exp().clamp(0.0, 1.0)
}

/// Fraction of the memory's entities mentioned in the query.
///
/// An entity counts as mentioned only when all of its tokens appear as
/// whole query tokens; substring hits ("berliner" for "Berlin") do not.
fn entity_relevance(entities: &BTreeSet<String>, query_tokens: &BTreeSet<String>) -> f64 {
    if entities.is_empty() {
        return 0.0;
    }
    let mentioned = entities
        .iter()
        .filter(|entity| {
            let entity_tokens = tokenize(&entity.to_lowercase());
            !entity_tokens.is_empty() && entity_tokens.is_subset(query_tokens)
        })
        .count();
    mentioned as f64 / entities.len() as f64
}

/// Inclusion cutoff from the statistical spread of scores:
/// `clamp(mean + 0.5 * stddev, floor, ceiling)`.
pub fn dynamic_threshold(scores: &[f64], floor: f64, ceiling: f64) -> f64 {
    if scores.is_empty() {
        return floor;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let variance =
        scores.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / scores.len() as f64;
    (mean + 0.5 * variance.sqrt()).clamp(floor, ceiling)
}

/// Lowercased alphanumeric tokens of at least two characters.
fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

/// One formatted context line: timestamp prefix plus content.
fn format_line(memory: &Memory) -> String {
    format!(
        "[{}] {}",
        memory.metadata.timestamp.format("%Y-%m-%d %H:%M"),
        memory.content
    )
}
