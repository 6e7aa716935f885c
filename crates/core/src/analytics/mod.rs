//! Owner analytics: revenue and sales statistics over the purchase ledger.
//!
//! [`ledger::read_completed_ledger`] joins every completed purchase with its
//! course and instructor; [`aggregate::aggregate`] folds those entries into
//! an [`OwnerAnalytics`] report.

pub mod aggregate;
pub mod ledger;

use serde_json::json;

use crate::access::{self, Capability};
use crate::models::{Role, User};
use crate::services::ServiceResult;
use crate::store::Repository;

pub use aggregate::{aggregate, InstructorRevenue, OwnerAnalytics, TopCourse, TOP_COURSES_LIMIT};
pub use ledger::{read_completed_ledger, LedgerEntry, LedgerInstructor};

#[derive(Debug, Clone)]
pub struct AnalyticsService {
    repo: Repository,
}

impl AnalyticsService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Platform-wide report. Any store failure fails the whole report.
    pub async fn owner_report(&self, caller: &User) -> ServiceResult<OwnerAnalytics> {
        access::require(caller, Capability::ViewOwnerAnalytics)?;

        let entries = read_completed_ledger(&self.repo).await?;
        let instructors = self
            .repo
            .find::<User>(json!({ "role": Role::Instructor }))
            .await?
            .len();

        let report = aggregate(&entries, instructors);
        tracing::debug!(
            sales = report.total_sales,
            revenue = report.total_revenue,
            "owner analytics computed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Purchase;
    use crate::services::{fixtures, ServiceError};

    #[tokio::test]
    async fn owner_report_end_to_end() {
        let repo = Repository::in_memory();
        let analytics = AnalyticsService::new(repo.clone());
        let owner = fixtures::user(&repo, "owner", Role::Owner).await;
        let tutor = fixtures::user(&repo, "tutor", Role::Instructor).await;
        fixtures::user(&repo, "tutor2", Role::Instructor).await;
        let student = fixtures::user(&repo, "student", Role::Student).await;
        let rust = fixtures::course(&repo, "Rust", &tutor, 100.0).await;
        let go = fixtures::course(&repo, "Go", &tutor, 50.0).await;

        repo.insert(&Purchase::completed(rust.id, student.id, 100.0))
            .await
            .unwrap();
        repo.insert(&Purchase::completed(go.id, student.id, 50.0))
            .await
            .unwrap();
        repo.insert(&Purchase::completed(rust.id, owner.id, 100.0))
            .await
            .unwrap();

        let report = analytics.owner_report(&owner).await.unwrap();
        assert_eq!(report.total_revenue, 250.0);
        assert_eq!(report.total_sales, 3);
        assert_eq!(report.total_instructors, 2);
        assert_eq!(report.top_courses[0].title, "Rust");
        assert_eq!(report.top_courses[0].sales, 2);

        let earned = &report.instructor_revenue[&tutor.id];
        assert_eq!(earned.total, 250.0);
        assert_eq!(earned.name, "tutor");
        assert_eq!(earned.email, "tutor@example.com");
    }

    #[tokio::test]
    async fn only_owner_sees_report() {
        let repo = Repository::in_memory();
        let analytics = AnalyticsService::new(repo.clone());
        let tutor = fixtures::user(&repo, "tutor", Role::Instructor).await;

        assert!(matches!(
            analytics.owner_report(&tutor).await,
            Err(ServiceError::Forbidden("Owner access only"))
        ));
    }
}
