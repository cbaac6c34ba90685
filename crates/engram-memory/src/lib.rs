// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion side of the Engram memory engine.
//!
//! Provides the similarity scorer (cosine kernel, Jaccard overlap, tier
//! classification) and the deduplication engine that decides, for each
//! newly observed conversational fact, between insert, skip, merge, and
//! update against the user's existing memory pool.
//!
//! ## Architecture
//!
//! - **similarity**: pure comparison functions and per-record guards
//! - **DeduplicationEngine**: embed → retrieve pool → classify → decide →
//!   execute, with a single degrade-to-insert recovery point

pub mod dedup;
pub mod similarity;

pub use dedup::DeduplicationEngine;
pub use similarity::{
    MatchTier, SimilarityMatch, classify, cosine_similarity, jaccard, rank_against_pool,
};
