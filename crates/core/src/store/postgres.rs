use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::{DocumentStore, StoreError};
use crate::document::{Collection, StoredDocument};

const INSERT_SQL: &str = "INSERT INTO documents (collection, id, content, created_at, updated_at) \
                          VALUES ($1, $2, $3, $4, $5)";
const GET_SQL: &str = "SELECT collection, id, content, created_at, updated_at FROM documents \
                       WHERE collection = $1 AND id = $2";
const REPLACE_SQL: &str = "UPDATE documents SET content = $3, updated_at = $4 \
                           WHERE collection = $1 AND id = $2 AND updated_at = $5";
const EXISTS_SQL: &str = "SELECT EXISTS (SELECT 1 FROM documents WHERE collection = $1 AND id = $2)";
const PRIMARY_KEY: &str = "documents_pkey";
const DELETE_SQL: &str = "DELETE FROM documents WHERE collection = $1 AND id = $2";
const FIND_SQL: &str = "SELECT collection, id, content, created_at, updated_at FROM documents \
                        WHERE collection = $1 AND content @> $2 \
                        ORDER BY created_at, id";

/// Document store over the `documents` table, one JSONB body per row.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn decode_row(row: &PgRow) -> Result<StoredDocument, StoreError> {
    let collection: String = row.try_get("collection")?;
    let collection =
        Collection::from_name(&collection).ok_or(StoreError::UnknownCollection(collection))?;

    Ok(StoredDocument {
        collection,
        id: row.try_get::<Uuid, _>("id")?,
        content: row.try_get::<Value, _>("content")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

/// Translate unique-index violations into the store's own errors.
fn unique_violation(err: sqlx::Error, doc: &StoredDocument) -> StoreError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => match db.constraint() {
            Some(PRIMARY_KEY) | None => StoreError::Duplicate {
                collection: doc.collection,
                id: doc.id,
            },
            Some(constraint) => StoreError::Unique {
                collection: doc.collection,
                constraint: constraint.to_string(),
            },
        },
        other => other.into(),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, doc: StoredDocument) -> Result<(), StoreError> {
        let result = sqlx::query(INSERT_SQL)
            .bind(doc.collection.as_str())
            .bind(doc.id)
            .bind(&doc.content)
            .bind(doc.created_at)
            .bind(doc.updated_at)
            .execute(&self.pool)
            .await;

        result.map(|_| ()).map_err(|e| unique_violation(e, &doc))
    }

    async fn get(
        &self,
        collection: Collection,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let row = sqlx::query(GET_SQL)
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_row).transpose()
    }

    async fn replace(
        &self,
        doc: StoredDocument,
        expected: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(REPLACE_SQL)
            .bind(doc.collection.as_str())
            .bind(doc.id)
            .bind(&doc.content)
            .bind(doc.updated_at)
            .bind(expected)
            .execute(&self.pool)
            .await
            .map_err(|e| unique_violation(e, &doc))?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let exists: bool = sqlx::query_scalar(EXISTS_SQL)
            .bind(doc.collection.as_str())
            .bind(doc.id)
            .fetch_one(&self.pool)
            .await?;
        if exists {
            Err(StoreError::Conflict {
                collection: doc.collection,
                id: doc.id,
            })
        } else {
            Ok(false)
        }
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(DELETE_SQL)
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let rows = sqlx::query(FIND_SQL)
            .bind(collection.as_str())
            .bind(filter)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(decode_row).collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
