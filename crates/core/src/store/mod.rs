//! Document persistence.
//!
//! Entities are schemaless JSON documents grouped by [`Collection`]. Stores
//! only know how to put, fetch, and filter documents; the typed
//! [`Repository`] on top handles (de)serialization of the models.

pub mod memory;
pub mod postgres;
pub mod repository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::document::{Collection, StoredDocument};

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;
pub use repository::Repository;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("document {collection}/{id} already exists")]
    Duplicate { collection: Collection, id: Uuid },

    /// A secondary unique index (see `migrations/`) rejected the write.
    #[error("{collection} document violates unique constraint {constraint}")]
    Unique {
        collection: Collection,
        constraint: String,
    },

    /// The document changed since it was read.
    #[error("document {collection}/{id} was modified concurrently")]
    Conflict { collection: Collection, id: Uuid },

    #[error("document {collection}/{id} could not be decoded: {source}")]
    Decode {
        collection: Collection,
        id: Uuid,
        #[source]
        source: serde_json::Error,
    },

    #[error("document could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("unknown collection in store: {0}")]
    UnknownCollection(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document. Fails with [`StoreError::Duplicate`] if the id
    /// is taken within the collection.
    async fn insert(&self, doc: StoredDocument) -> Result<(), StoreError>;

    async fn get(
        &self,
        collection: Collection,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// Overwrite an existing document's content and `updated_at`, provided
    /// its stored `updated_at` still equals `expected`. Returns `false` if
    /// there was nothing to replace and [`StoreError::Conflict`] if another
    /// write landed first.
    async fn replace(
        &self,
        doc: StoredDocument,
        expected: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError>;

    /// All documents whose content contains `filter`, oldest first.
    ///
    /// Containment follows PostgreSQL's `jsonb @>`: every key of a filter
    /// object must match, and every element of a filter array must be
    /// present in the document's array.
    async fn find(
        &self,
        collection: Collection,
        filter: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Cheap connectivity check.
    async fn ping(&self) -> Result<(), StoreError>;
}

pub const USER_EMAIL_INDEX: &str = "documents_user_email_idx";
pub const COMPLETED_PURCHASE_INDEX: &str = "documents_completed_purchase_idx";

/// The secondary unique key `doc` claims, if any, as
/// `(index name, key value)`. Mirrors the partial unique indexes created by
/// the migrations.
pub fn unique_key(doc: &StoredDocument) -> Option<(&'static str, Value)> {
    let content = &doc.content;
    match doc.collection {
        Collection::Users => content
            .get("email")
            .map(|email| (USER_EMAIL_INDEX, email.clone())),
        Collection::Purchases
            if content.get("status").and_then(Value::as_str) == Some("completed") =>
        {
            Some((
                COMPLETED_PURCHASE_INDEX,
                Value::Array(vec![
                    content.get("courseId").cloned().unwrap_or(Value::Null),
                    content.get("userId").cloned().unwrap_or(Value::Null),
                ]),
            ))
        }
        _ => None,
    }
}

/// Whether `doc` contains `pattern`, with `jsonb @>` semantics.
pub fn json_contains(doc: &Value, pattern: &Value) -> bool {
    match (doc, pattern) {
        (Value::Object(doc), Value::Object(pattern)) => pattern
            .iter()
            .all(|(key, want)| doc.get(key).is_some_and(|have| json_contains(have, want))),
        (Value::Array(doc), Value::Array(pattern)) => pattern
            .iter()
            .all(|want| doc.iter().any(|have| json_contains(have, want))),
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (a, b) => a == b,
    }
}
