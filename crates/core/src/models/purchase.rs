use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{Collection, CourseId, Document, PurchaseId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Completed,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry in the purchase ledger. Only `status` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: PurchaseId,
    pub course_id: CourseId,
    pub user_id: UserId,
    #[serde(default)]
    pub amount: Option<f64>,
    pub status: PurchaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    /// A finalized purchase settled by a simulated payment.
    pub fn completed(course_id: CourseId, user_id: UserId, amount: f64) -> Self {
        let now = Utc::now();
        Self {
            id: PurchaseId::new(),
            course_id,
            user_id,
            amount: Some(amount),
            status: PurchaseStatus::Completed,
            payment_id: Some(format!("FAKE_PAYMENT_{}", now.timestamp_millis())),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == PurchaseStatus::Completed
    }
}

impl Document for Purchase {
    const COLLECTION: Collection = Collection::Purchases;

    fn uuid(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}
