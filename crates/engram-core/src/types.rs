// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types for the Engram memory engine.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single long-term conversational memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Unique identifier, assigned on creation, immutable.
    pub id: String,
    /// The factual content of this memory.
    pub content: String,
    /// Embedding vector for semantic comparison. `None` for legacy records
    /// and for degraded inserts where embedding generation failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Provenance and scoring metadata.
    pub metadata: MemoryMetadata,
}

/// Metadata attached to every stored memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMetadata {
    /// When the underlying conversational fact was observed.
    pub timestamp: DateTime<Utc>,
    /// Importance score in [0, 1].
    pub importance: f64,
    /// Named entities mentioned in the content.
    pub entities: BTreeSet<String>,
    /// Topics the content relates to.
    pub topics: BTreeSet<String>,
    /// Number of conversation messages this memory was distilled from.
    pub message_count: u32,
    /// Number of times this memory was refreshed by an update or merge.
    pub update_count: u32,
    /// Chat the fact was observed in, if any. A ranking factor for merge
    /// target selection, never a retrieval filter.
    pub chat_id: Option<String>,
    /// Owning user. The only retrieval-scoping key.
    pub user_id: String,
}

/// A newly observed conversational fact, not yet persisted.
///
/// Has no id or embedding until the deduplication engine processes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCandidate {
    pub content: String,
    pub user_id: String,
    pub chat_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub importance: f64,
    pub entities: BTreeSet<String>,
    pub topics: BTreeSet<String>,
    pub message_count: u32,
}

/// The action the deduplication engine took for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DedupAction {
    /// Stored as a brand-new memory.
    Insert,
    /// Discarded as a duplicate of an existing memory.
    Skip,
    /// Folded into an existing memory (content, metadata, and embedding
    /// all recomputed).
    Merge,
    /// Refreshed an existing memory (content replaced, metadata unioned).
    Update,
}

impl DedupAction {
    /// Stable wire string for persistence and telemetry.
    pub fn as_str(&self) -> &'static str {
        match self {
            DedupAction::Insert => "insert",
            DedupAction::Skip => "skip",
            DedupAction::Merge => "merge",
            DedupAction::Update => "update",
        }
    }

    /// Parse from a wire string.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "skip" => DedupAction::Skip,
            "merge" => DedupAction::Merge,
            "update" => DedupAction::Update,
            _ => DedupAction::Insert,
        }
    }
}

/// Outcome of processing one candidate.
///
/// Exactly one action per candidate. `memory` is populated for
/// insert/merge/update and absent for skip.
#[derive(Debug, Clone)]
pub struct DeduplicationResult {
    pub action: DedupAction,
    /// The stored or mutated memory. `None` only for `Skip`.
    pub memory: Option<Memory>,
    /// Memories in the related tier (below merge/duplicate), returned for
    /// caller context.
    pub related: Vec<Memory>,
    /// Human-readable explanation of the decision.
    pub reason: Option<String>,
}

/// Tagged result of `process_candidate`, making degraded paths visible in
/// the type signature instead of hidden in error handling.
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// The decision policy ran to completion.
    Decided(DeduplicationResult),
    /// An infrastructure fault occurred and the engine fell back to insert
    /// so the conversational fact is not lost.
    Degraded {
        result: DeduplicationResult,
        reason: String,
    },
}

impl ProcessOutcome {
    /// The deduplication result, regardless of degradation.
    pub fn result(&self) -> &DeduplicationResult {
        match self {
            ProcessOutcome::Decided(result) => result,
            ProcessOutcome::Degraded { result, .. } => result,
        }
    }

    /// Whether the engine took the degraded fallback path.
    pub fn is_degraded(&self) -> bool {
        matches!(self, ProcessOutcome::Degraded { .. })
    }
}
