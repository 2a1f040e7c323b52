//! In-memory artifact store.

use dashmap::DashMap;
use serde_json::Value;

use super::{ArtifactStore, Result, StoreKey};

/// Process-local store backed by a concurrent map.
///
/// Keyed on the structured [`StoreKey`], so session ids containing `:`
/// cannot alias another session's documents. Contents are lost on restart;
/// used for development and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<StoreKey, Value>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait::async_trait]
impl ArtifactStore for MemoryStore {
    async fn get(&self, key: &StoreKey) -> Result<Option<Value>> {
        Ok(self
            .documents
            .get(key)
            .map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &StoreKey, document: Value) -> Result<()> {
        self.documents.insert(key.clone(), document);
        Ok(())
    }
}
