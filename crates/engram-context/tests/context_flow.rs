// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end context assembly: selection, budget check, compression.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use engram_config::EngramConfig;
use engram_context::{CompressionTechnique, ContextBuilder, estimate_tokens};
use engram_core::types::{Memory, MemoryMetadata};
use engram_test_utils::MockEmbedder;

fn memory(id: &str, content: &str, timestamp: DateTime<Utc>) -> Memory {
    Memory {
        id: id.to_string(),
        content: content.to_string(),
        embedding: Some(vec![1.0, 0.0]),
        metadata: MemoryMetadata {
            timestamp,
            importance: 1.0,
            entities: BTreeSet::new(),
            topics: BTreeSet::new(),
            message_count: 1,
            update_count: 0,
            chat_id: None,
            user_id: "user-1".to_string(),
        },
    }
}

fn builder() -> ContextBuilder {
    ContextBuilder::new(
        Arc::new(MockEmbedder::returning(vec![1.0, 0.0])),
        &EngramConfig::default(),
    )
}

#[tokio::test]
async fn empty_pool_yields_empty_context() {
    let result = builder().build_context(&[], "anything").await;
    assert_eq!(result.technique, CompressionTechnique::Empty);
    assert!(result.content.is_empty());
    assert_eq!(result.compressed_tokens, 0);
    assert_eq!(result.compression_ratio, 1.0);
}

#[tokio::test]
async fn pool_with_no_relevance_yields_empty_context() {
    // No embeddings, no lexical overlap, zero importance, ancient
    // timestamps: every score sits well below the threshold floor.
    let old = Utc::now() - Duration::days(400);
    let pool: Vec<Memory> = (0..3)
        .map(|i| {
            let mut m = memory(&format!("m{i}"), "stale unrelated note", old);
            m.embedding = None;
            m.metadata.importance = 0.0;
            m
        })
        .collect();

    let result = builder().build_context(&pool, "quarterly planning").await;
    assert_eq!(result.technique, CompressionTechnique::Empty);
}

#[tokio::test]
async fn selection_within_budget_is_passed_through() {
    let ts = Utc::now() - Duration::hours(1);
    let mut first = memory("m1", "user lives in Berlin", ts);
    first.metadata.entities.insert("Berlin".to_string());
    let pool = vec![
        first,
        memory("m2", "user works at a small startup", ts),
        memory("m3", "user prefers morning meetings", ts),
    ];

    let result = builder().build_context(&pool, "tell me about the user").await;
    assert_eq!(result.technique, CompressionTechnique::SelectiveOnly);
    assert_eq!(result.compressed_tokens, result.original_tokens);
    assert_eq!(result.compression_ratio, 1.0);
    assert!(result.content.contains("Berlin"));
    assert!(result.preserved_entities.contains(&"Berlin".to_string()));

    // Token accounting matches the per-line estimates of the joined lines.
    let expected: usize = result
        .content
        .split("\n\n")
        .map(estimate_tokens)
        .sum();
    assert_eq!(result.compressed_tokens, expected);
}

#[tokio::test]
async fn oversized_selection_is_compressed_under_budget() {
    // Ten memories at roughly forty tokens each, against a 100-token
    // budget: selection alone cannot fit, compression must run.
    let ts = Utc::now() - Duration::hours(1);
    let pool: Vec<Memory> = (0..10)
        .map(|i| {
            let content = format!(
                "Fact number {i} about the ongoing project covers several detailed points. \
                 It also notes follow up work that still needs to be scheduled soon."
            );
            memory(&format!("m{i}"), &content, ts)
        })
        .collect();

    let budget = 100;
    let result = builder()
        .build_context_with_budget(&pool, "project follow up", budget)
        .await;

    assert_eq!(result.technique, CompressionTechnique::SemanticCompression);
    assert!(result.original_tokens > budget);
    // Target is 90% of the budget; the output must not exceed it.
    assert!(result.compressed_tokens <= budget * 9 / 10);
    assert!(result.compressed_tokens > 0);
    assert!(result.compression_ratio < 1.0);
    assert_eq!(
        result.compressed_tokens,
        estimate_tokens(&result.content)
    );
}

#[tokio::test]
async fn compression_keeps_source_order() {
    let ts = Utc::now() - Duration::hours(1);
    let pool: Vec<Memory> = (0..6)
        .map(|i| {
            let content = format!(
                "Fact number {i} about the ongoing project covers several detailed points."
            );
            memory(&format!("m{i}"), &content, ts)
        })
        .collect();

    // Budget small enough to force compression but large enough to retain
    // several equally scored sentences.
    let result = builder()
        .build_context_with_budget(&pool, "ongoing project", 60)
        .await;
    assert_eq!(result.technique, CompressionTechnique::SemanticCompression);

    let positions: Vec<usize> = (0..6)
        .filter_map(|i| result.content.find(&format!("Fact number {i}")))
        .collect();
    assert!(positions.len() >= 2, "expected more than one retained fact");
    assert!(
        positions.windows(2).all(|w| w[0] < w[1]),
        "retained facts must keep their original order"
    );
}

#[tokio::test]
async fn query_embedding_failure_degrades_to_lexical_selection() {
    let ts = Utc::now() - Duration::hours(1);
    let pool = vec![
        memory("m1", "user lives in berlin these days", ts),
        memory("m2", "user is allergic to peanuts", ts),
    ];

    let builder = ContextBuilder::new(
        Arc::new(MockEmbedder::failing()),
        &EngramConfig::default(),
    );
    let result = builder.build_context(&pool, "berlin").await;

    // Retrieval stays best-effort: the lexically matching memory is
    // still selected on the renormalized weights.
    assert_ne!(result.technique, CompressionTechnique::Empty);
    assert!(result.content.contains("berlin"));
}
