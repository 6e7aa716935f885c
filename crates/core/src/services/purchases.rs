use std::collections::HashMap;

use serde_json::json;

use super::{update_existing, OrNotFound, ServiceError, ServiceResult};
use crate::access::{self, Capability};
use crate::document::CourseId;
use crate::models::views::{CourseSnippet, PurchaseWithCourse};
use crate::models::{Course, Purchase, User};
use crate::store::{Repository, StoreError};

#[derive(Debug, Clone)]
pub struct PurchaseService {
    repo: Repository,
}

impl PurchaseService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Buy `course_id` with a simulated payment and enroll the caller.
    ///
    /// A second purchase of a course the caller already completed is
    /// rejected without writing anything. The store's unique index on
    /// completed purchases settles concurrent attempts.
    pub async fn purchase(&self, caller: &User, course_id: CourseId) -> ServiceResult<Purchase> {
        let course = self
            .repo
            .get::<Course>(course_id)
            .await?
            .or_not_found("Course")?;

        let existing = self
            .repo
            .find_one::<Purchase>(json!({
                "courseId": course.id,
                "userId": caller.id,
                "status": "completed",
            }))
            .await?;
        if existing.is_some() {
            return Err(ServiceError::AlreadyPurchased);
        }

        let purchase = Purchase::completed(course.id, caller.id, course.price());
        match self.repo.insert(&purchase).await {
            Ok(()) => {}
            Err(StoreError::Unique { .. }) => return Err(ServiceError::AlreadyPurchased),
            Err(e) => return Err(e.into()),
        }

        update_existing(&self.repo, course.id, "Course", |course: &mut Course| {
            course.enroll(caller.id);
            Ok(())
        })
        .await?;

        self.repo
            .update(caller.id, |buyer: &mut User| -> ServiceResult<()> {
                buyer.enroll(course.id);
                Ok(())
            })
            .await?
            .ok_or(ServiceError::Unauthenticated)?;

        tracing::info!(
            purchase_id = %purchase.id,
            course_id = %course.id,
            user_id = %caller.id,
            amount = course.price(),
            "course purchased"
        );
        Ok(purchase)
    }

    /// The caller's completed purchases, oldest first.
    pub async fn for_buyer(&self, caller: &User) -> ServiceResult<Vec<PurchaseWithCourse>> {
        let purchases = self
            .repo
            .find::<Purchase>(json!({ "userId": caller.id, "status": "completed" }))
            .await?;

        let mut snippets: HashMap<CourseId, Option<CourseSnippet>> = HashMap::new();
        let mut resolved = Vec::with_capacity(purchases.len());
        for purchase in purchases {
            let course = match snippets.get(&purchase.course_id) {
                Some(cached) => cached.clone(),
                None => {
                    let snippet = self
                        .repo
                        .get::<Course>(purchase.course_id)
                        .await?
                        .as_ref()
                        .map(CourseSnippet::from);
                    snippets.insert(purchase.course_id, snippet.clone());
                    snippet
                }
            };
            resolved.push(PurchaseWithCourse { purchase, course });
        }
        Ok(resolved)
    }

    /// Completed sales of the courses the caller created.
    pub async fn instructor_sales(&self, caller: &User) -> ServiceResult<Vec<PurchaseWithCourse>> {
        access::require(caller, Capability::AuthorCourses)?;

        let own: HashMap<CourseId, CourseSnippet> = self
            .repo
            .find::<Course>(json!({ "creator": caller.id }))
            .await?
            .iter()
            .map(|c| (c.id, CourseSnippet::from(c)))
            .collect();

        let sales = self
            .repo
            .find::<Purchase>(json!({ "status": "completed" }))
            .await?
            .into_iter()
            .filter_map(|purchase| {
                own.get(&purchase.course_id).map(|snippet| PurchaseWithCourse {
                    course: Some(snippet.clone()),
                    purchase,
                })
            })
            .collect();
        Ok(sales)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::services::fixtures;

    #[tokio::test]
    async fn purchase_enrolls_both_sides() {
        let repo = Repository::in_memory();
        let purchases = PurchaseService::new(repo.clone());
        let tutor = fixtures::user(&repo, "tutor", Role::Instructor).await;
        let student = fixtures::user(&repo, "student", Role::Student).await;
        let course = fixtures::course(&repo, "Rust", &tutor, 25.0).await;

        let purchase = purchases.purchase(&student, course.id).await.unwrap();
        assert_eq!(purchase.amount, Some(25.0));
        assert!(purchase.is_completed());

        let course: Course = repo.get(course.id).await.unwrap().unwrap();
        assert_eq!(course.enrolled_students, vec![student.id]);
        let student: User = repo.get(student.id).await.unwrap().unwrap();
        assert_eq!(student.enrolled_courses, vec![course.id]);
    }

    #[tokio::test]
    async fn duplicate_purchase_is_rejected_without_new_record() {
        let repo = Repository::in_memory();
        let purchases = PurchaseService::new(repo.clone());
        let tutor = fixtures::user(&repo, "tutor", Role::Instructor).await;
        let student = fixtures::user(&repo, "student", Role::Student).await;
        let course = fixtures::course(&repo, "Rust", &tutor, 25.0).await;

        purchases.purchase(&student, course.id).await.unwrap();
        let err = purchases.purchase(&student, course.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyPurchased));

        let all: Vec<Purchase> = repo.all().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_buyers_are_all_enrolled() {
        let repo = Repository::in_memory();
        let purchases = PurchaseService::new(repo.clone());
        let tutor = fixtures::user(&repo, "tutor", Role::Instructor).await;
        let course = fixtures::course(&repo, "Rust", &tutor, 25.0).await;

        let mut students = Vec::new();
        for i in 0..32 {
            students.push(fixtures::user(&repo, &format!("student{i}"), Role::Student).await);
        }

        let tasks: Vec<_> = students
            .iter()
            .cloned()
            .map(|student| {
                let purchases = purchases.clone();
                let course_id = course.id;
                tokio::spawn(async move { purchases.purchase(&student, course_id).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let course: Course = repo.get(course.id).await.unwrap().unwrap();
        assert_eq!(course.enrolled_students.len(), 32);
        for student in &students {
            assert!(course.enrolled_students.contains(&student.id));
            let stored: User = repo.get(student.id).await.unwrap().unwrap();
            assert_eq!(stored.enrolled_courses, vec![course.id]);
        }
        let ledger: Vec<Purchase> = repo.all().await.unwrap();
        assert_eq!(ledger.len(), 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_repeat_purchases_complete_once() {
        let repo = Repository::in_memory();
        let purchases = PurchaseService::new(repo.clone());
        let tutor = fixtures::user(&repo, "tutor", Role::Instructor).await;
        let student = fixtures::user(&repo, "student", Role::Student).await;
        let course = fixtures::course(&repo, "Rust", &tutor, 25.0).await;

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let purchases = purchases.clone();
                let student = student.clone();
                let course_id = course.id;
                tokio::spawn(async move { purchases.purchase(&student, course_id).await })
            })
            .collect();

        let mut completed = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => completed += 1,
                Err(err) => assert!(matches!(err, ServiceError::AlreadyPurchased), "{err}"),
            }
        }
        assert_eq!(completed, 1);

        let ledger: Vec<Purchase> = repo.all().await.unwrap();
        assert_eq!(ledger.len(), 1);
        let course: Course = repo.get(course.id).await.unwrap().unwrap();
        assert_eq!(course.enrolled_students, vec![student.id]);
    }

    #[tokio::test]
    async fn free_course_records_zero_amount() {
        let repo = Repository::in_memory();
        let purchases = PurchaseService::new(repo.clone());
        let tutor = fixtures::user(&repo, "tutor", Role::Instructor).await;
        let mut course = fixtures::course(&repo, "Free", &tutor, 0.0).await;
        course.info.course_price = None;
        repo.save(&mut course).await.unwrap();

        let purchase = purchases.purchase(&tutor, course.id).await.unwrap();
        assert_eq!(purchase.amount, Some(0.0));
    }

    #[tokio::test]
    async fn unknown_course_is_not_found() {
        let repo = Repository::in_memory();
        let purchases = PurchaseService::new(repo.clone());
        let student = fixtures::user(&repo, "student", Role::Student).await;

        let err = purchases.purchase(&student, CourseId::new()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("Course")));
    }

    #[tokio::test]
    async fn buyer_and_instructor_views() {
        let repo = Repository::in_memory();
        let purchases = PurchaseService::new(repo.clone());
        let tutor = fixtures::user(&repo, "tutor", Role::Instructor).await;
        let rival = fixtures::user(&repo, "rival", Role::Instructor).await;
        let student = fixtures::user(&repo, "student", Role::Student).await;
        let mine = fixtures::course(&repo, "Rust", &tutor, 25.0).await;
        let theirs = fixtures::course(&repo, "Go", &rival, 15.0).await;

        purchases.purchase(&student, mine.id).await.unwrap();
        purchases.purchase(&student, theirs.id).await.unwrap();

        let bought = purchases.for_buyer(&student).await.unwrap();
        let titles: Vec<_> = bought
            .iter()
            .filter_map(|p| p.course.as_ref().map(|c| c.course_title.as_str()))
            .collect();
        assert_eq!(titles, vec!["Rust", "Go"]);

        let sales = purchases.instructor_sales(&tutor).await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].purchase.course_id, mine.id);

        assert!(matches!(
            purchases.instructor_sales(&student).await,
            Err(ServiceError::Forbidden(_))
        ));
    }
}
