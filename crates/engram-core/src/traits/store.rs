// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory store trait: the persistence contract the engine decides against.

use async_trait::async_trait;

use crate::error::EngramError;
use crate::types::Memory;

/// Per-user persistence for memories.
///
/// The engine defines the decision logic in front of a store, not the store
/// itself. A production implementation is expected to back this with a
/// vector-capable index; `engram-test-utils` ships an in-memory reference
/// implementation. Deletion is a store-level administrative operation and
/// deliberately absent from this contract.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Retrieve every memory for a user. User id is the only scoping
    /// filter; chat-level affinity is applied later as a ranking factor.
    async fn get_all_for_user(&self, user_id: &str) -> Result<Vec<Memory>, EngramError>;

    /// Persist a brand-new memory.
    async fn insert(&self, memory: &Memory) -> Result<(), EngramError>;

    /// Persist an in-place mutation of an existing memory.
    async fn update(&self, memory: &Memory) -> Result<(), EngramError>;
}
