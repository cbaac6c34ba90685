// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deduplication engine: decides whether a newly observed conversational
//! fact is stored as a new memory, merged into an existing one, used to
//! refresh one, or discarded as a duplicate.
//!
//! The engine embeds the candidate, compares it against the user's memory
//! pool, classifies matches into duplicate/merge/related tiers, and applies
//! a first-match decision policy. Any infrastructure fault short of a store
//! write failure degrades to insert, so a transient outage never loses a
//! conversational fact and never blocks the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use engram_config::DedupConfig;
use engram_core::error::EngramError;
use engram_core::traits::{EmbeddingProvider, MemoryStore};
use engram_core::types::{
    DedupAction, DeduplicationResult, Memory, MemoryCandidate, MemoryMetadata, ProcessOutcome,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::similarity::{MatchTier, SimilarityMatch, jaccard, rank_against_pool};

/// Merge-target affinity bonus for sharing the candidate's chat.
const CHAT_AFFINITY_BONUS: f64 = 10.0;

/// Maximum recency bonus; decays linearly to zero over the window.
const RECENCY_BONUS: f64 = 10.0;

/// Days over which the recency bonus decays from full to zero.
const RECENCY_WINDOW_DAYS: f64 = 10.0;

/// Affinity bonus scale for topic and entity Jaccard overlap.
const OVERLAP_BONUS: f64 = 5.0;

/// Marker inserted between merged contents when neither subsumes the other.
const MERGE_MARKER: &str = "\n\n[Additional Context]\n";

/// Orchestrates embedding generation, pool comparison, classification, and
/// action execution for incoming memory candidates.
pub struct DeduplicationEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn MemoryStore>,
    config: DedupConfig,
}

impl DeduplicationEngine {
    /// Creates a new engine over injected collaborators.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn MemoryStore>,
        config: DedupConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Process one candidate, returning the action taken.
    ///
    /// This is the single recovery point of the ingestion flow: embedding
    /// failures, timeouts, store read failures, and malformed records all
    /// degrade to an insert tagged [`ProcessOutcome::Degraded`]. A fault
    /// after embedding succeeded still stores the embedding, so the memory
    /// stays visible to future similarity comparison. Store write failures
    /// are the one class that is surfaced as `Err`, since swallowing them
    /// would lose conversational state silently.
    pub async fn process_candidate(
        &self,
        candidate: MemoryCandidate,
    ) -> Result<ProcessOutcome, EngramError> {
        let text = truncate_chars(&candidate.content, self.config.max_embed_chars);
        let embedding = match self.embed_with_deadline(text).await {
            Ok(embedding) => embedding,
            Err(err) => return self.degraded_insert(&candidate, None, err).await,
        };

        match self.decide(&candidate, embedding.clone()).await {
            Ok(result) => Ok(ProcessOutcome::Decided(result)),
            Err(err @ EngramError::StoreWrite { .. }) => Err(err),
            Err(err) => self.degraded_insert(&candidate, Some(embedding), err).await,
        }
    }

    /// Fallback insert for the recovery point, tagged with the fault that
    /// triggered it. `embedding` is whatever was generated before the
    /// fault, `None` only when embedding itself failed.
    async fn degraded_insert(
        &self,
        candidate: &MemoryCandidate,
        embedding: Option<Vec<f32>>,
        err: EngramError,
    ) -> Result<ProcessOutcome, EngramError> {
        warn!(
            user_id = %candidate.user_id,
            error = %err,
            "deduplication degraded to insert"
        );
        let reason = err.to_string();
        let memory = self.insert_candidate(candidate, embedding).await?;
        Ok(ProcessOutcome::Degraded {
            result: DeduplicationResult {
                action: DedupAction::Insert,
                memory: Some(memory),
                related: vec![],
                reason: Some(reason.clone()),
            },
            reason,
        })
    }

    /// Run the full decision policy. Errors propagate to the recovery
    /// point in [`process_candidate`].
    async fn decide(
        &self,
        candidate: &MemoryCandidate,
        embedding: Vec<f32>,
    ) -> Result<DeduplicationResult, EngramError> {
        let pool = self.store.get_all_for_user(&candidate.user_id).await?;
        let matches = rank_against_pool(&embedding, pool, &self.config);

        let mut duplicates = Vec::new();
        let mut merge_candidates = Vec::new();
        let mut related = Vec::new();
        for m in matches {
            match m.tier {
                MatchTier::Duplicate => duplicates.push(m),
                MatchTier::Merge => merge_candidates.push(m),
                MatchTier::Related => related.push(m.memory),
            }
        }

        // First matching rule wins: duplicate, then merge, then insert.
        if !duplicates.is_empty() {
            let closest = duplicates.remove(0);
            if has_additional_context(candidate, &closest.memory, self.config.added_context_ratio)
            {
                return self
                    .execute_update(candidate, closest, embedding, related, duplicates.len() + 1)
                    .await;
            }
            return Ok(execute_skip(closest, related, duplicates.len() + 1));
        }

        if !merge_candidates.is_empty() {
            let target = select_merge_target(candidate, merge_candidates, Utc::now());
            return self.execute_merge(candidate, target, embedding, related).await;
        }

        let memory = self.insert_candidate(candidate, Some(embedding)).await?;
        Ok(DeduplicationResult {
            action: DedupAction::Insert,
            memory: Some(memory),
            related,
            reason: None,
        })
    }

    /// Embed with the configured deadline; expiry maps to `Timeout` and
    /// takes the same degrade path as any other embedding failure.
    async fn embed_with_deadline(&self, text: &str) -> Result<Vec<f32>, EngramError> {
        let deadline = Duration::from_secs(self.config.embed_timeout_secs);
        match tokio::time::timeout(deadline, self.embedder.embed(text)).await {
            Ok(result) => result,
            Err(_) => Err(EngramError::Timeout { duration: deadline }),
        }
    }

    /// Refresh the closest duplicate with the candidate's richer content.
    async fn execute_update(
        &self,
        candidate: &MemoryCandidate,
        closest: SimilarityMatch,
        embedding: Vec<f32>,
        related: Vec<Memory>,
        duplicate_count: usize,
    ) -> Result<DeduplicationResult, EngramError> {
        let mut updated = closest.memory;
        updated.content = candidate.content.clone();
        updated
            .metadata
            .entities
            .extend(candidate.entities.iter().cloned());
        updated
            .metadata
            .topics
            .extend(candidate.topics.iter().cloned());
        updated.metadata.update_count += 1;
        updated.embedding = Some(embedding);

        self.store.update(&updated).await?;
        debug!(memory_id = %updated.id, score = closest.score, "duplicate refreshed with additional context");

        Ok(DeduplicationResult {
            action: DedupAction::Update,
            memory: Some(updated),
            related,
            reason: Some(format!(
                "candidate carries additional context over the closest of {duplicate_count} duplicate(s)"
            )),
        })
    }

    /// Fold the candidate into the best-affinity merge target.
    async fn execute_merge(
        &self,
        candidate: &MemoryCandidate,
        target: SimilarityMatch,
        embedding: Vec<f32>,
        related: Vec<Memory>,
    ) -> Result<DeduplicationResult, EngramError> {
        let mut merged = target.memory;
        merged.content = merge_content(&merged.content, &candidate.content);
        merged
            .metadata
            .entities
            .extend(candidate.entities.iter().cloned());
        merged
            .metadata
            .topics
            .extend(candidate.topics.iter().cloned());
        merged.metadata.importance = merged.metadata.importance.max(candidate.importance);
        merged.metadata.update_count += 1;
        merged.metadata.message_count += 1;
        merged.embedding = Some(match merged.embedding.as_deref() {
            Some(existing) => average_embedding(existing, &embedding),
            None => embedding,
        });

        self.store.update(&merged).await?;
        debug!(memory_id = %merged.id, score = target.score, "candidate merged into existing memory");

        Ok(DeduplicationResult {
            action: DedupAction::Merge,
            memory: Some(merged),
            related,
            reason: Some(format!(
                "merged into existing memory at similarity {:.3}",
                target.score
            )),
        })
    }

    /// Persist the candidate as a brand-new memory.
    async fn insert_candidate(
        &self,
        candidate: &MemoryCandidate,
        embedding: Option<Vec<f32>>,
    ) -> Result<Memory, EngramError> {
        let memory = Memory {
            id: Uuid::new_v4().to_string(),
            content: candidate.content.clone(),
            embedding,
            metadata: MemoryMetadata {
                timestamp: candidate.timestamp,
                importance: candidate.importance.clamp(0.0, 1.0),
                entities: candidate.entities.clone(),
                topics: candidate.topics.clone(),
                message_count: candidate.message_count,
                update_count: 0,
                chat_id: candidate.chat_id.clone(),
                user_id: candidate.user_id.clone(),
            },
        };
        self.store.insert(&memory).await?;
        Ok(memory)
    }
}

/// Skip is the only action with no mutation and no memory in the result.
fn execute_skip(
    closest: SimilarityMatch,
    related: Vec<Memory>,
    duplicate_count: usize,
) -> DeduplicationResult {
    debug!(memory_id = %closest.memory.id, score = closest.score, "candidate skipped as duplicate");
    DeduplicationResult {
        action: DedupAction::Skip,
        memory: None,
        related,
        reason: Some(format!(
            "duplicate of {} ({duplicate_count} duplicate(s) at or above threshold)",
            closest.memory.id
        )),
    }
}

/// Whether the candidate adds information over an existing duplicate:
/// noticeably longer content, a new entity, or a new topic.
fn has_additional_context(
    candidate: &MemoryCandidate,
    existing: &Memory,
    length_ratio: f64,
) -> bool {
    let candidate_len = candidate.content.chars().count() as f64;
    let existing_len = existing.content.chars().count() as f64;
    if candidate_len > existing_len * length_ratio {
        return true;
    }
    if candidate
        .entities
        .iter()
        .any(|e| !existing.metadata.entities.contains(e))
    {
        return true;
    }
    candidate
        .topics
        .iter()
        .any(|t| !existing.metadata.topics.contains(t))
}

/// Pick the merge target with the highest affinity to the candidate.
///
/// Affinity favors the same chat, recent memories (linear decay over
/// roughly ten days), and topic/entity overlap. Ties keep the
/// higher-similarity match, which arrives first in the sorted input.
fn select_merge_target(
    candidate: &MemoryCandidate,
    merge_candidates: Vec<SimilarityMatch>,
    now: DateTime<Utc>,
) -> SimilarityMatch {
    debug_assert!(!merge_candidates.is_empty());
    let mut best: Option<(f64, SimilarityMatch)> = None;
    for m in merge_candidates {
        let affinity = merge_affinity(candidate, &m.memory, now);
        // Strict comparison: on equal affinity the earlier (higher
        // similarity) match wins.
        if best.as_ref().is_none_or(|(best_affinity, _)| affinity > *best_affinity) {
            best = Some((affinity, m));
        }
    }
    best.map(|(_, m)| m).expect("merge_candidates is non-empty")
}

/// Weighted affinity between a candidate and a potential merge target.
fn merge_affinity(candidate: &MemoryCandidate, memory: &Memory, now: DateTime<Utc>) -> f64 {
    let mut score = 0.0;

    if candidate.chat_id.is_some() && candidate.chat_id == memory.metadata.chat_id {
        score += CHAT_AFFINITY_BONUS;
    }

    let age_days = (now - memory.metadata.timestamp).num_seconds() as f64 / 86_400.0;
    score += (RECENCY_BONUS * (1.0 - age_days / RECENCY_WINDOW_DAYS)).clamp(0.0, RECENCY_BONUS);

    score += OVERLAP_BONUS * jaccard(&candidate.topics, &memory.metadata.topics);
    score += OVERLAP_BONUS * jaccard(&candidate.entities, &memory.metadata.entities);

    score
}

/// Merge two contents losslessly: keep the superset verbatim when one
/// contains the other, otherwise concatenate with the merge marker.
fn merge_content(existing: &str, incoming: &str) -> String {
    if existing.contains(incoming) {
        return existing.to_string();
    }
    if incoming.contains(existing) {
        return incoming.to_string();
    }
    format!("{existing}{MERGE_MARKER}{incoming}")
}

/// Elementwise average of two equal-length embeddings.
///
/// Callers guarantee equal lengths: both vectors came from the same
/// provider and passed the dimension guard during classification.
fn average_embedding(a: &[f32], b: &[f32]) -> Vec<f32> {
    a.iter().zip(b.iter()).map(|(x, y)| (x + y) / 2.0).collect()
}

/// Truncate to a character cap without splitting a code point.
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
