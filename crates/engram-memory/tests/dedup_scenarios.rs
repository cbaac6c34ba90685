// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end deduplication scenarios against deterministic doubles.
//!
//! Pool memories are seeded with hand-picked unit vectors so the cosine
//! similarity against the candidate embedding `[1, 0]` is exact: a memory
//! with embedding `[c, sqrt(1 - c^2)]` scores exactly `c`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use engram_config::DedupConfig;
use engram_core::error::EngramError;
use engram_core::types::{DedupAction, Memory, MemoryCandidate, MemoryMetadata};
use engram_memory::DeduplicationEngine;
use engram_test_utils::{InMemoryStore, MockEmbedder};

const USER: &str = "user-1";
const CHAT: &str = "chat-1";

fn candidate(content: &str) -> MemoryCandidate {
    MemoryCandidate {
        content: content.to_string(),
        user_id: USER.to_string(),
        chat_id: Some(CHAT.to_string()),
        timestamp: Utc::now(),
        importance: 0.6,
        entities: BTreeSet::new(),
        topics: BTreeSet::new(),
        message_count: 1,
    }
}

/// A pool memory whose similarity to the candidate embedding `[1, 0]`
/// is exactly `score`.
fn pool_memory(id: &str, content: &str, score: f32) -> Memory {
    let other = (1.0 - score * score).max(0.0).sqrt();
    Memory {
        id: id.to_string(),
        content: content.to_string(),
        embedding: Some(vec![score, other]),
        metadata: MemoryMetadata {
            timestamp: Utc::now(),
            importance: 0.5,
            entities: BTreeSet::new(),
            topics: BTreeSet::new(),
            message_count: 1,
            update_count: 0,
            chat_id: Some(CHAT.to_string()),
            user_id: USER.to_string(),
        },
    }
}

fn engine(store: Arc<InMemoryStore>) -> DeduplicationEngine {
    DeduplicationEngine::new(
        Arc::new(MockEmbedder::returning(vec![1.0, 0.0])),
        store,
        DedupConfig::default(),
    )
}

/// Scenario A: textually identical candidate, no new entities or topics.
#[tokio::test]
async fn identical_candidate_is_skipped() {
    let existing = pool_memory("mem-1", "the user's dog is named Max", 1.0);
    let store = Arc::new(InMemoryStore::seeded(vec![existing]).await);
    let engine = engine(store.clone());

    let outcome = engine
        .process_candidate(candidate("the user's dog is named Max"))
        .await
        .unwrap();

    assert!(!outcome.is_degraded());
    let result = outcome.result();
    assert_eq!(result.action, DedupAction::Skip);
    assert!(result.memory.is_none(), "skip must not carry a memory");
    assert!(result.reason.as_deref().unwrap().contains("mem-1"));
    // No mutation happened.
    assert_eq!(store.count_for_user(USER).await, 1);
    let stored = store.get(USER, "mem-1").await.unwrap();
    assert_eq!(stored.metadata.update_count, 0);
}

/// Scenario B: duplicate content but the candidate names new entities.
#[tokio::test]
async fn duplicate_with_new_entities_updates() {
    let mut existing = pool_memory("mem-1", "the user's dog is named Max", 1.0);
    existing.metadata.entities.insert("Max".to_string());
    let store = Arc::new(InMemoryStore::seeded(vec![existing]).await);
    let engine = engine(store.clone());

    let mut cand = candidate("the user's dog is named Max");
    cand.entities.insert("Luna".to_string());
    cand.entities.insert("Berlin".to_string());

    let result = engine.process_candidate(cand).await.unwrap();
    let result = result.result();
    assert_eq!(result.action, DedupAction::Update);

    let updated = result.memory.as_ref().unwrap();
    assert_eq!(updated.id, "mem-1");
    assert!(updated.metadata.entities.contains("Max"));
    assert!(updated.metadata.entities.contains("Luna"));
    assert!(updated.metadata.entities.contains("Berlin"));
    assert_eq!(updated.metadata.update_count, 1);
    // Embedding replaced with the freshly generated one.
    assert_eq!(updated.embedding.as_deref(), Some(&[1.0, 0.0][..]));

    let stored = store.get(USER, "mem-1").await.unwrap();
    assert_eq!(stored.metadata.update_count, 1);
}

/// A longer restatement of a duplicate also counts as additional context.
#[tokio::test]
async fn duplicate_with_longer_content_updates() {
    let existing = pool_memory("mem-1", "user likes tea", 0.96);
    let store = Arc::new(InMemoryStore::seeded(vec![existing]).await);
    let engine = engine(store.clone());

    let result = engine
        .process_candidate(candidate(
            "user likes tea, specifically oolong brewed at 90 degrees every morning",
        ))
        .await
        .unwrap();
    assert_eq!(result.result().action, DedupAction::Update);

    let stored = store.get(USER, "mem-1").await.unwrap();
    assert!(stored.content.contains("oolong"));
}

/// Scenario C: two merge-band memories; the one sharing the candidate's
/// chat wins target selection.
#[tokio::test]
async fn merge_prefers_same_chat_target() {
    let mut other_chat = pool_memory("other-chat", "user is learning Rust", 0.88);
    other_chat.metadata.chat_id = Some("chat-9".to_string());
    let same_chat = pool_memory("same-chat", "user is studying systems programming", 0.88);
    let store = Arc::new(InMemoryStore::seeded(vec![other_chat, same_chat]).await);
    let engine = engine(store.clone());

    let result = engine
        .process_candidate(candidate("user started a Rust project this week"))
        .await
        .unwrap();
    let result = result.result();
    assert_eq!(result.action, DedupAction::Merge);

    let merged = result.memory.as_ref().unwrap();
    assert_eq!(merged.id, "same-chat");
    // Lossless merge: both texts present via the marker.
    assert!(merged.content.contains("user is studying systems programming"));
    assert!(merged.content.contains("user started a Rust project this week"));
    assert!(merged.content.contains("[Additional Context]"));
    assert_eq!(merged.metadata.update_count, 1);
    assert_eq!(merged.metadata.message_count, 2);

    // Untouched memory stays as it was.
    let untouched = store.get(USER, "other-chat").await.unwrap();
    assert_eq!(untouched.metadata.update_count, 0);
}

/// Merged embedding is the elementwise average of both source embeddings.
#[tokio::test]
async fn merge_averages_embeddings() {
    let target = pool_memory("mem-1", "user is learning Rust", 0.88);
    let target_embedding = target.embedding.clone().unwrap();
    let store = Arc::new(InMemoryStore::seeded(vec![target]).await);
    let engine = engine(store.clone());

    let result = engine
        .process_candidate(candidate("user started a Rust project"))
        .await
        .unwrap();
    let merged = result.result().memory.clone().unwrap();
    let merged_embedding = merged.embedding.unwrap();

    let candidate_embedding = [1.0f32, 0.0];
    for i in 0..2 {
        let expected = (target_embedding[i] + candidate_embedding[i]) / 2.0;
        assert!(
            (merged_embedding[i] - expected).abs() < 1e-6,
            "component {i}: expected {expected}, got {}",
            merged_embedding[i]
        );
    }
}

/// Merge keeps max importance of the two constituents.
#[tokio::test]
async fn merge_takes_max_importance() {
    let mut target = pool_memory("mem-1", "user is learning Rust", 0.90);
    target.metadata.importance = 0.9;
    let store = Arc::new(InMemoryStore::seeded(vec![target]).await);
    let engine = engine(store.clone());

    let mut cand = candidate("user started a Rust project");
    cand.importance = 0.3;
    let result = engine.process_candidate(cand).await.unwrap();
    let merged = result.result().memory.clone().unwrap();
    assert_eq!(merged.metadata.importance, 0.9);
}

/// Related-band memories are reported but the candidate is inserted.
#[tokio::test]
async fn related_band_inserts_and_reports() {
    let related = pool_memory("mem-related", "user has a bicycle", 0.75);
    let store = Arc::new(InMemoryStore::seeded(vec![related]).await);
    let engine = engine(store.clone());

    let result = engine
        .process_candidate(candidate("user commutes by bike on Tuesdays"))
        .await
        .unwrap();
    let result = result.result();
    assert_eq!(result.action, DedupAction::Insert);
    assert_eq!(result.related.len(), 1);
    assert_eq!(result.related[0].id, "mem-related");

    let inserted = result.memory.as_ref().unwrap();
    assert_eq!(inserted.metadata.update_count, 0);
    assert_eq!(inserted.embedding.as_deref(), Some(&[1.0, 0.0][..]));
    assert_eq!(store.count_for_user(USER).await, 2);
}

/// Below the related threshold nothing qualifies at all.
#[tokio::test]
async fn unrelated_pool_plain_insert() {
    let unrelated = pool_memory("mem-1", "user has a bicycle", 0.60);
    let store = Arc::new(InMemoryStore::seeded(vec![unrelated]).await);
    let engine = engine(store.clone());

    let result = engine
        .process_candidate(candidate("user's favorite color is green"))
        .await
        .unwrap();
    let result = result.result();
    assert_eq!(result.action, DedupAction::Insert);
    assert!(result.related.is_empty());
    assert_eq!(store.count_for_user(USER).await, 2);
}

/// Embedding failure degrades to insert rather than losing the fact.
#[tokio::test]
async fn embedding_failure_degrades_to_insert() {
    let store = Arc::new(InMemoryStore::new());
    let engine = DeduplicationEngine::new(
        Arc::new(MockEmbedder::failing()),
        store.clone(),
        DedupConfig::default(),
    );

    let outcome = engine
        .process_candidate(candidate("user lives in Berlin"))
        .await
        .unwrap();
    assert!(outcome.is_degraded());
    let result = outcome.result();
    assert_eq!(result.action, DedupAction::Insert);
    // The fact is stored without an embedding.
    let inserted = result.memory.as_ref().unwrap();
    assert!(inserted.embedding.is_none());
    assert_eq!(store.count_for_user(USER).await, 1);
}

/// Embedding timeout takes the same degrade path as any other failure.
#[tokio::test(start_paused = true)]
async fn embedding_timeout_degrades_to_insert() {
    let store = Arc::new(InMemoryStore::new());
    let slow =
        MockEmbedder::returning(vec![1.0, 0.0]).with_delay(Duration::from_secs(60));
    let engine = DeduplicationEngine::new(Arc::new(slow), store.clone(), DedupConfig::default());

    let outcome = engine
        .process_candidate(candidate("user lives in Berlin"))
        .await
        .unwrap();
    assert!(outcome.is_degraded());
    assert_eq!(outcome.result().action, DedupAction::Insert);
    match outcome {
        engram_core::types::ProcessOutcome::Degraded { reason, .. } => {
            assert!(reason.contains("timed out"), "got reason: {reason}");
        }
        other => panic!("expected degraded outcome, got {other:?}"),
    }
}

/// Store read failure degrades to insert. The embedding was already
/// generated at that point and must be stored with the memory, or every
/// fact ingested during a read outage would be invisible to future
/// similarity comparison.
#[tokio::test]
async fn store_read_failure_degrades_to_insert_with_embedding() {
    let store = Arc::new(InMemoryStore::new());
    store.set_fail_reads(true);
    let engine = engine(store.clone());

    let outcome = engine
        .process_candidate(candidate("user lives in Berlin"))
        .await
        .unwrap();
    assert!(outcome.is_degraded());
    let result = outcome.result();
    assert_eq!(result.action, DedupAction::Insert);
    assert_eq!(store.count_for_user(USER).await, 1);

    let inserted = result.memory.as_ref().unwrap();
    assert_eq!(inserted.embedding.as_deref(), Some(&[1.0, 0.0][..]));
    let stored = store.get(USER, &inserted.id).await.unwrap();
    assert_eq!(stored.embedding.as_deref(), Some(&[1.0, 0.0][..]));
}

/// Store write failure must surface to the caller, never be swallowed.
#[tokio::test]
async fn store_write_failure_surfaces() {
    let store = Arc::new(InMemoryStore::new());
    store.set_fail_writes(true);
    let engine = engine(store.clone());

    let err = engine
        .process_candidate(candidate("user lives in Berlin"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngramError::StoreWrite { .. }));
}

/// A malformed record in the pool is skipped, not fatal to the batch.
#[tokio::test]
async fn malformed_record_does_not_abort_processing() {
    let mut malformed = pool_memory("bad-dims", "corrupted record", 1.0);
    malformed.embedding = Some(vec![1.0, 0.0, 0.0]); // wrong dimensionality
    let good = pool_memory("mem-good", "the user's dog is named Max", 1.0);
    let store = Arc::new(InMemoryStore::seeded(vec![malformed, good]).await);
    let engine = engine(store.clone());

    let outcome = engine
        .process_candidate(candidate("the user's dog is named Max"))
        .await
        .unwrap();
    assert!(!outcome.is_degraded());
    // The well-formed duplicate still drives the decision.
    assert_eq!(outcome.result().action, DedupAction::Skip);
}
