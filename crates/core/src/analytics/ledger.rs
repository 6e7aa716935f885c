use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::document::{CourseId, UserId};
use crate::models::{Course, Purchase, PurchaseStatus, User};
use crate::store::{Repository, StoreError};

/// A purchase with the course and instructor data the report needs.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub amount: Option<f64>,
    pub status: PurchaseStatus,
    pub created_at: DateTime<Utc>,
    /// `None` when the course no longer exists.
    pub course_title: Option<String>,
    /// `None` when the course has no instructor or the account is gone.
    pub instructor: Option<LedgerInstructor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerInstructor {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// Every completed purchase, oldest first, with its course and the course's
/// instructor resolved.
///
/// Missing courses or instructors resolve to `None`. A store failure aborts
/// the read.
pub async fn read_completed_ledger(repo: &Repository) -> Result<Vec<LedgerEntry>, StoreError> {
    let purchases = repo
        .find::<Purchase>(json!({ "status": PurchaseStatus::Completed }))
        .await?;

    let mut courses: HashMap<CourseId, Option<Course>> = HashMap::new();
    let mut instructors: HashMap<UserId, Option<LedgerInstructor>> = HashMap::new();
    let mut entries = Vec::with_capacity(purchases.len());

    for purchase in purchases {
        if !courses.contains_key(&purchase.course_id) {
            let course = repo.get::<Course>(purchase.course_id).await?;
            courses.insert(purchase.course_id, course);
        }
        let course = courses.get(&purchase.course_id).and_then(Option::as_ref);

        let instructor = match course.and_then(|c| c.instructor) {
            Some(id) => {
                if !instructors.contains_key(&id) {
                    let resolved = repo.get::<User>(id).await?.map(|user| LedgerInstructor {
                        id: user.id,
                        name: user.name,
                        email: user.email,
                    });
                    instructors.insert(id, resolved);
                }
                instructors.get(&id).cloned().flatten()
            }
            None => None,
        };

        entries.push(LedgerEntry {
            amount: purchase.amount,
            status: purchase.status,
            created_at: purchase.created_at,
            course_title: course.map(|c| c.title().to_string()),
            instructor,
        });
    }

    Ok(entries)
}
