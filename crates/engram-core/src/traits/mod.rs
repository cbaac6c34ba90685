// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the external collaborators of the memory engine.

pub mod embedding;
pub mod store;

pub use embedding::EmbeddingProvider;
pub use store::MemoryStore;
