// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic test doubles for the Engram memory engine.
//!
//! Provides a mock embedding provider with configurable vectors, failure,
//! and delay injection, plus an in-memory `MemoryStore` reference
//! implementation with read/write failure injection. Both exercise the
//! success and degraded paths of the engines without external services.

pub mod memory_store;
pub mod mock_embedder;

pub use memory_store::InMemoryStore;
pub use mock_embedder::MockEmbedder;
