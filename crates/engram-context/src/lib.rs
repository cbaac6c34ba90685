// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token-budgeted context assembly for Engram.
//!
//! The pipeline has two stages. [`SelectiveContext`] scores a memory pool
//! against a query with a composite of semantic, lexical, importance,
//! recency and entity signals, keeping everything above a dynamic
//! threshold. When the selected set does not fit the token budget,
//! [`SemanticCompressor`] reduces it sentence by sentence. The
//! [`ContextBuilder`] ties the stages together and records which
//! technique produced the final snippet.

pub mod compressor;
pub mod selector;
pub mod tokens;

use std::sync::Arc;

use engram_config::EngramConfig;
use engram_core::{EmbeddingProvider, Memory};
use tracing::debug;

pub use compressor::{CompressedContext, CompressionTechnique, SemanticCompressor};
pub use selector::{ScoredMemory, SelectionResult, SelectiveContext};
pub use tokens::{CHARS_PER_TOKEN, estimate_tokens};

/// Fraction of the budget the compressor may actually fill; the rest is
/// headroom for prompt framing around the snippet.
struct ContextBudget {
    tokens: usize,
    budget_ratio: f64,
}

/// End-to-end context assembly: selection, then compression when needed.
pub struct ContextBuilder {
    selector: SelectiveContext,
    compressor: SemanticCompressor,
    budget: ContextBudget,
}

impl ContextBuilder {
    /// Builds the pipeline from a full configuration.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, config: &EngramConfig) -> Self {
        Self {
            selector: SelectiveContext::new(embedder, config.selection.clone()),
            compressor: SemanticCompressor::new(config.compression.clone()),
            budget: ContextBudget {
                tokens: config.selection.token_budget,
                budget_ratio: config.compression.budget_ratio,
            },
        }
    }

    /// Assembles context for `query` under the configured token budget.
    pub async fn build_context(&self, pool: &[Memory], query: &str) -> CompressedContext {
        self.build_context_with_budget(pool, query, self.budget.tokens)
            .await
    }

    /// Assembles context for `query` under an explicit token budget.
    ///
    /// Never fails: an empty pool or empty selection yields an empty
    /// context, and a selection that already fits the budget is passed
    /// through uncompressed.
    pub async fn build_context_with_budget(
        &self,
        pool: &[Memory],
        query: &str,
        token_budget: usize,
    ) -> CompressedContext {
        let selection = self.selector.select(pool, query).await;
        if selection.selected_count == 0 {
            debug!("nothing selected, returning empty context");
            return CompressedContext::empty();
        }

        if selection.total_tokens <= token_budget {
            debug!(
                tokens = selection.total_tokens,
                token_budget,
                selected = selection.selected_count,
                "selection fits budget"
            );
            return self.selective_only(selection);
        }

        let target = (token_budget as f64 * self.budget.budget_ratio).floor() as usize;
        debug!(
            tokens = selection.total_tokens,
            token_budget,
            target,
            selected = selection.selected_count,
            "selection over budget, compressing"
        );
        let mut compressed = self
            .compressor
            .compress(&selection.content, query, target);
        // The ratio is measured against the selected set, not the
        // compressor's view of its input.
        compressed.original_tokens = selection.total_tokens;
        compressed.compression_ratio = if selection.total_tokens == 0 {
            1.0
        } else {
            compressed.compressed_tokens as f64 / selection.total_tokens as f64
        };
        compressed
    }

    fn selective_only(&self, selection: SelectionResult) -> CompressedContext {
        let mut entities: Vec<String> = Vec::new();
        for scored in &selection.memories {
            for entity in &scored.memory.metadata.entities {
                if !entities.contains(entity) {
                    entities.push(entity.clone());
                }
            }
        }
        CompressedContext {
            content: selection.content,
            original_tokens: selection.total_tokens,
            compressed_tokens: selection.total_tokens,
            compression_ratio: 1.0,
            preserved_entities: entities,
            important_sentences: Vec::new(),
            technique: CompressionTechnique::SelectiveOnly,
        }
    }
}
