use std::fmt;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{DocumentStore, MemoryStore, StoreError};
use crate::document::{Document, StoredDocument};

/// Attempts [`Repository::update`] makes before giving up. Each conflict
/// means some other writer committed, so this only runs out under sustained
/// contention on a single document.
const MAX_WRITE_ATTEMPTS: usize = 64;

/// Typed access to the document store. Cheap to clone.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// A repository over a fresh, empty [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    pub async fn get<T: Document>(&self, id: impl Into<Uuid>) -> Result<Option<T>, StoreError> {
        self.store
            .get(T::COLLECTION, id.into())
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn insert<T: Document>(&self, doc: &T) -> Result<(), StoreError> {
        self.store.insert(encode(doc)?).await
    }

    /// Persist changes to an existing document, stamping `updated_at`.
    /// Returns `false` if the document no longer exists and
    /// [`StoreError::Conflict`] if it changed since `doc` was read.
    pub async fn save<T: Document>(&self, doc: &mut T) -> Result<bool, StoreError> {
        let previous = doc.updated_at();
        // Strictly later than `previous`, even at microsecond storage precision,
        // so every write is visible to the next compare.
        doc.touch(Utc::now().max(previous + Duration::microseconds(1)));
        self.store.replace(encode(doc)?, previous).await
    }

    /// Read-modify-write with optimistic concurrency: `apply` runs against
    /// the freshest stored copy and is re-run whenever a concurrent writer
    /// committed first. Returns `None` if the document does not exist.
    pub async fn update<T, E, F>(&self, id: impl Into<Uuid>, mut apply: F) -> Result<Option<T>, E>
    where
        T: Document,
        E: From<StoreError>,
        F: FnMut(&mut T) -> Result<(), E>,
    {
        let id = id.into();
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let Some(mut doc) = self.get::<T>(id).await? else {
                return Ok(None);
            };
            apply(&mut doc)?;

            match self.save(&mut doc).await {
                Ok(true) => return Ok(Some(doc)),
                Ok(false) => return Ok(None),
                Err(StoreError::Conflict { .. }) => {
                    tracing::debug!(collection = %T::COLLECTION, %id, attempt, "write conflict, retrying");
                    tokio::task::yield_now().await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(collection = %T::COLLECTION, %id, "giving up after repeated write conflicts");
        Err(StoreError::Conflict {
            collection: T::COLLECTION,
            id,
        }
        .into())
    }

    pub async fn delete<T: Document>(&self, id: impl Into<Uuid>) -> Result<bool, StoreError> {
        self.store.delete(T::COLLECTION, id.into()).await
    }

    /// Documents containing `filter` (see [`DocumentStore::find`]), oldest first.
    pub async fn find<T: Document>(&self, filter: Value) -> Result<Vec<T>, StoreError> {
        self.store
            .find(T::COLLECTION, &filter)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn find_one<T: Document>(&self, filter: Value) -> Result<Option<T>, StoreError> {
        Ok(self.find(filter).await?.into_iter().next())
    }

    pub async fn all<T: Document>(&self) -> Result<Vec<T>, StoreError> {
        self.find(json!({})).await
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository").finish_non_exhaustive()
    }
}

fn encode<T: Document>(doc: &T) -> Result<StoredDocument, StoreError> {
    Ok(StoredDocument {
        collection: T::COLLECTION,
        id: doc.uuid(),
        content: serde_json::to_value(doc).map_err(StoreError::Encode)?,
        created_at: doc.created_at(),
        updated_at: doc.updated_at(),
    })
}

fn decode<T: Document>(stored: StoredDocument) -> Result<T, StoreError> {
    serde_json::from_value(stored.content).map_err(|source| StoreError::Decode {
        collection: stored.collection,
        id: stored.id,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Collection;
    use crate::models::{Course, Lecture, Purchase, User};

    #[tokio::test]
    async fn typed_round_trip_through_store() {
        let repo = Repository::in_memory();
        let user = User::new("Ada".into(), "ada@example.com".into(), "h".into());
        repo.insert(&user).await.unwrap();

        let fetched: User = repo.get(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, "ada@example.com");
        assert!(repo.get::<Course>(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_touches_updated_at() {
        let repo = Repository::in_memory();
        let mut lecture = Lecture::new("Intro".into());
        let created = lecture.updated_at;
        repo.insert(&lecture).await.unwrap();

        lecture.lecture_title = "Intro (v2)".into();
        assert!(repo.save(&mut lecture).await.unwrap());
        assert!(lecture.updated_at >= created);

        let fetched: Lecture = repo.get(lecture.id).await.unwrap().unwrap();
        assert_eq!(fetched.lecture_title, "Intro (v2)");
    }

    #[tokio::test]
    async fn stale_save_is_a_conflict() {
        let repo = Repository::in_memory();
        let mut lecture = Lecture::new("Intro".into());
        repo.insert(&lecture).await.unwrap();
        let mut stale = lecture.clone();

        lecture.lecture_title = "First".into();
        assert!(repo.save(&mut lecture).await.unwrap());

        stale.lecture_title = "Second".into();
        let err = repo.save(&mut stale).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { collection: Collection::Lectures, .. }));

        let stored: Lecture = repo.get(lecture.id).await.unwrap().unwrap();
        assert_eq!(stored.lecture_title, "First");
    }

    #[tokio::test]
    async fn update_of_missing_document_is_none() {
        let repo = Repository::in_memory();
        let updated = repo
            .update::<Lecture, StoreError, _>(crate::document::LectureId::new(), |_| Ok(()))
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_updates_are_not_lost() {
        let repo = Repository::in_memory();
        let owner = User::new("O".into(), "o@example.com".into(), "h".into());
        let course = Course::new("T".into(), "C".into(), owner.id);
        repo.insert(&course).await.unwrap();
        let course_id = course.id;

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    let student = crate::document::UserId::new();
                    repo.update::<Course, StoreError, _>(course_id, |c| {
                        c.enroll(student);
                        Ok(())
                    })
                    .await
                    .unwrap()
                    .unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let stored: Course = repo.get(course_id).await.unwrap().unwrap();
        assert_eq!(stored.enrolled_students.len(), 32);
    }

    #[tokio::test]
    async fn find_by_typed_id_filter() {
        let repo = Repository::in_memory();
        let buyer = User::new("B".into(), "b@example.com".into(), "h".into());
        let course = Course::new("T".into(), "C".into(), buyer.id);
        repo.insert(&Purchase::completed(course.id, buyer.id, 5.0))
            .await
            .unwrap();
        repo.insert(&Purchase::completed(course.id, crate::document::UserId::new(), 5.0))
            .await
            .unwrap();

        let mine: Vec<Purchase> = repo
            .find(json!({ "userId": buyer.id, "courseId": course.id }))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id, buyer.id);
    }

    #[tokio::test]
    async fn undecodable_content_reports_decode_error() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let id = Uuid::now_v7();
        store
            .insert(StoredDocument {
                collection: Collection::Users,
                id,
                content: json!({"name": 42}),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let repo = Repository::new(store);
        let err = repo.get::<User>(id).await.unwrap_err();
        assert!(matches!(err, StoreError::Decode { collection: Collection::Users, .. }));
    }
}
