// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Engram memory engine.

use thiserror::Error;

/// The primary error type used across all Engram traits and core operations.
#[derive(Debug, Error)]
pub enum EngramError {
    /// Embedding provider errors (unreachable, rate-limited, malformed output).
    #[error("embedding generation failed: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Memory pool retrieval failed. Recovered locally by callers
    /// (ingestion treats the pool as empty, retrieval returns empty context).
    #[error("memory store read failed: {source}")]
    StoreRead {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Persisting an insert/update/merge failed. Always surfaced to the
    /// caller, since conversational state may otherwise be lost silently.
    #[error("memory store write failed: {source}")]
    StoreWrite {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Two vectors of unequal length were compared. Guarded per record:
    /// the offending record is skipped, never aborting a whole batch.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An embedding call exceeded its configured deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngramError {
    /// Convenience constructor for embedding failures without an underlying cause.
    pub fn embedding(message: impl Into<String>) -> Self {
        EngramError::Embedding {
            message: message.into(),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_variants_construct_and_display() {
        let e = EngramError::embedding("provider unreachable");
        assert!(e.to_string().contains("provider unreachable"));

        let e = EngramError::StoreRead {
            source: Box::new(std::io::Error::other("connection reset")),
        };
        assert!(e.to_string().starts_with("memory store read failed"));

        let e = EngramError::StoreWrite {
            source: Box::new(std::io::Error::other("disk full")),
        };
        assert!(e.to_string().starts_with("memory store write failed"));

        let e = EngramError::DimensionMismatch {
            expected: 384,
            actual: 768,
        };
        assert_eq!(
            e.to_string(),
            "embedding dimension mismatch: expected 384, got 768"
        );

        let e = EngramError::Timeout {
            duration: std::time::Duration::from_secs(10),
        };
        assert!(e.to_string().contains("timed out"));

        let e = EngramError::Internal("unexpected".into());
        assert_eq!(e.to_string(), "internal error: unexpected");
    }
}
