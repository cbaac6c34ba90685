// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory reference implementation of the `MemoryStore` trait.
//!
//! Doubles as the test store (with read/write failure injection) and as a
//! usable store for embedded deployments that do not need durability.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use engram_core::error::EngramError;
use engram_core::traits::MemoryStore;
use engram_core::types::Memory;

/// Per-user in-memory store with failure injection.
#[derive(Default)]
pub struct InMemoryStore {
    memories: Mutex<HashMap<String, Vec<Memory>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with the given memories.
    pub async fn seeded(memories: Vec<Memory>) -> Self {
        let store = Self::new();
        {
            let mut map = store.memories.lock().await;
            for memory in memories {
                map.entry(memory.metadata.user_id.clone())
                    .or_default()
                    .push(memory);
            }
        }
        store
    }

    /// Make every subsequent read fail with `StoreRead`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail with `StoreWrite`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of memories stored for a user.
    pub async fn count_for_user(&self, user_id: &str) -> usize {
        self.memories
            .lock()
            .await
            .get(user_id)
            .map_or(0, Vec::len)
    }

    /// Fetch a stored memory by id, ignoring failure injection.
    pub async fn get(&self, user_id: &str, id: &str) -> Option<Memory> {
        self.memories
            .lock()
            .await
            .get(user_id)
            .and_then(|memories| memories.iter().find(|m| m.id == id).cloned())
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn get_all_for_user(&self, user_id: &str) -> Result<Vec<Memory>, EngramError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(EngramError::StoreRead {
                source: Box::new(std::io::Error::other("injected read failure")),
            });
        }
        Ok(self
            .memories
            .lock()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert(&self, memory: &Memory) -> Result<(), EngramError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(EngramError::StoreWrite {
                source: Box::new(std::io::Error::other("injected write failure")),
            });
        }
        let mut map = self.memories.lock().await;
        let memories = map.entry(memory.metadata.user_id.clone()).or_default();
        if memories.iter().any(|m| m.id == memory.id) {
            return Err(EngramError::StoreWrite {
                source: Box::new(std::io::Error::other(format!(
                    "duplicate memory id {}",
                    memory.id
                ))),
            });
        }
        memories.push(memory.clone());
        Ok(())
    }

    async fn update(&self, memory: &Memory) -> Result<(), EngramError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(EngramError::StoreWrite {
                source: Box::new(std::io::Error::other("injected write failure")),
            });
        }
        let mut map = self.memories.lock().await;
        let Some(existing) = map
            .get_mut(&memory.metadata.user_id)
            .and_then(|memories| memories.iter_mut().find(|m| m.id == memory.id))
        else {
            return Err(EngramError::StoreWrite {
                source: Box::new(std::io::Error::other(format!(
                    "no memory with id {} to update",
                    memory.id
                ))),
            });
        };
        *existing = memory.clone();
        Ok(())
    }
}
