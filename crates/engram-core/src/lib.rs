// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Engram conversational memory engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Engram workspace. The embedding provider
//! and memory store are external collaborators expressed as traits here, so
//! the decision engines can be tested against deterministic doubles.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::EngramError;
pub use traits::{EmbeddingProvider, MemoryStore};
pub use types::{
    DedupAction, DeduplicationResult, Memory, MemoryCandidate, MemoryMetadata, ProcessOutcome,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_type_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EngramError>();
    }

    #[test]
    fn trait_objects_are_shareable() {
        // The engines hold collaborators behind Arc<dyn Trait>; both traits
        // must stay object-safe and Send + Sync.
        fn assert_shareable<T: ?Sized + Send + Sync>() {}
        assert_shareable::<dyn EmbeddingProvider>();
        assert_shareable::<dyn MemoryStore>();
    }
}
