use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{json_contains, unique_key, DocumentStore, StoreError};
use crate::document::{Collection, StoredDocument};

/// Process-local store for tests and throwaway local runs.
/// Documents are kept per collection in insertion order. Enforces the same
/// unique keys as the PostgreSQL schema.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<StoredDocument>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, doc: StoredDocument) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(doc.collection).or_default();
        if docs.iter().any(|d| d.id == doc.id) {
            return Err(StoreError::Duplicate {
                collection: doc.collection,
                id: doc.id,
            });
        }
        check_unique(docs, &doc)?;
        docs.push(doc);
        Ok(())
    }

    async fn get(
        &self,
        collection: Collection,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn replace(
        &self,
        doc: StoredDocument,
        expected: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&doc.collection) else {
            return Ok(false);
        };
        let Some(position) = docs.iter().position(|d| d.id == doc.id) else {
            return Ok(false);
        };
        if docs[position].updated_at != expected {
            return Err(StoreError::Conflict {
                collection: doc.collection,
                id: doc.id,
            });
        }
        check_unique(docs, &doc)?;

        let existing = &mut docs[position];
        existing.content = doc.content;
        existing.updated_at = doc.updated_at;
        Ok(true)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() != before)
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| json_contains(&d.content, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Reject `doc` if another document already holds its unique key.
fn check_unique(docs: &[StoredDocument], doc: &StoredDocument) -> Result<(), StoreError> {
    let Some((constraint, key)) = unique_key(doc) else {
        return Ok(());
    };
    let taken = docs
        .iter()
        .filter(|other| other.id != doc.id)
        .any(|other| unique_key(other).is_some_and(|(_, other_key)| other_key == key));

    if taken {
        Err(StoreError::Unique {
            collection: doc.collection,
            constraint: constraint.to_string(),
        })
    } else {
        Ok(())
    }
}
