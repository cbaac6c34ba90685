// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::EngramError;

/// Produces a fixed-length dense vector for a piece of text.
///
/// Implemented by external model clients (remote APIs or local inference).
/// The engine truncates input to its configured character cap before
/// calling and wraps the call in a deadline; implementations do not need
/// their own timeout handling. Retry policy is the implementation's
/// responsibility, not the engine's.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generates an embedding for the given text.
    ///
    /// All vectors returned by one provider must have the same length.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngramError>;
}
