// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock embedding provider for deterministic testing.
//!
//! `MockEmbedder` implements `EmbeddingProvider` with pre-configured
//! vectors, failure injection, and an optional artificial delay for
//! exercising the engine's deadline handling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use engram_core::error::EngramError;
use engram_core::traits::EmbeddingProvider;

/// A mock embedding provider that returns pre-configured vectors.
///
/// Inputs are matched against registered substrings in registration order;
/// unmatched inputs get the default vector. Failure and delay injection
/// cover the degraded paths.
pub struct MockEmbedder {
    default: Vec<f32>,
    mappings: Vec<(String, Vec<f32>)>,
    fail: AtomicBool,
    delay: Option<Duration>,
}

impl MockEmbedder {
    /// Create a mock that returns `vector` for every input.
    pub fn returning(vector: Vec<f32>) -> Self {
        Self {
            default: vector,
            mappings: Vec::new(),
            fail: AtomicBool::new(false),
            delay: None,
        }
    }

    /// Create a mock whose every call fails with an embedding error.
    pub fn failing() -> Self {
        let embedder = Self::returning(vec![]);
        embedder.fail.store(true, Ordering::SeqCst);
        embedder
    }

    /// Return `vector` for any input containing `needle`.
    pub fn with_mapping(mut self, needle: &str, vector: Vec<f32>) -> Self {
        self.mappings.push((needle.to_string(), vector));
        self
    }

    /// Sleep for `delay` before responding, to exercise deadline handling.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Toggle failure injection after construction.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngramError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngramError::embedding("mock embedder failure"));
        }
        for (needle, vector) in &self.mappings {
            if text.contains(needle) {
                return Ok(vector.clone());
            }
        }
        Ok(self.default.clone())
    }
}
