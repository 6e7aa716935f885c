//! Resolved read models.
//!
//! Documents reference each other by id. Handlers that need the referenced
//! data get one of these value objects, built by the services after fetching
//! the referenced documents explicitly.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Course, CourseInfo, Lecture, Purchase, User};
use crate::document::{CourseId, LectureId, UserId};

/// Name and avatar of a user, as shown next to courses and reviews.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub photo_url: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            photo_url: user.photo_url.clone(),
        }
    }
}

/// A review with its author resolved; `user` is `None` once the author's
/// account is gone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewView {
    pub user: Option<UserSummary>,
    pub rating: u8,
    pub comment: String,
}

/// Catalogue entry: a course with its creator resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCard {
    pub id: CourseId,
    #[serde(flatten)]
    pub info: CourseInfo,
    pub creator: Option<UserSummary>,
    pub instructor: Option<UserId>,
    pub lectures: Vec<LectureId>,
    pub is_published: bool,
    pub rating: f64,
    pub enrolled_students: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseCard {
    pub fn new(course: Course, creator: Option<UserSummary>) -> Self {
        Self {
            id: course.id,
            info: course.info,
            creator,
            instructor: course.instructor,
            lectures: course.lectures,
            is_published: course.is_published,
            rating: course.rating,
            enrolled_students: course.enrolled_students,
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

/// A single course with review authors resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseWithReviews {
    pub id: CourseId,
    #[serde(flatten)]
    pub info: CourseInfo,
    pub creator: UserId,
    pub instructor: Option<UserId>,
    pub lectures: Vec<LectureId>,
    pub is_published: bool,
    pub reviews: Vec<ReviewView>,
    pub rating: f64,
    pub enrolled_students: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseWithReviews {
    pub fn new(course: Course, reviews: Vec<ReviewView>) -> Self {
        Self {
            id: course.id,
            info: course.info,
            creator: course.creator,
            instructor: course.instructor,
            lectures: course.lectures,
            is_published: course.is_published,
            reviews,
            rating: course.rating,
            enrolled_students: course.enrolled_students,
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

/// Public profile of a course's creator with their teaching stats.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorProfile {
    #[serde(flatten)]
    pub summary: UserSummary,
    pub profession: String,
    pub bio: String,
    pub total_courses: usize,
    pub total_students: usize,
    pub total_reviews: usize,
    pub rating: f64,
}

/// Full course page: lectures, reviews and the creator's profile resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    pub id: CourseId,
    #[serde(flatten)]
    pub info: CourseInfo,
    /// `None` once the creator's account is gone.
    pub creator: Option<InstructorProfile>,
    pub instructor: Option<UserId>,
    pub lectures: Vec<Lecture>,
    pub is_published: bool,
    pub reviews: Vec<ReviewView>,
    pub rating: f64,
    pub enrolled_students: Vec<UserId>,
    /// Total lecture length, e.g. `"1h 20m"`.
    pub duration: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Title and price of a purchased course.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSnippet {
    pub id: CourseId,
    pub course_title: String,
    pub course_price: Option<f64>,
}

impl From<&Course> for CourseSnippet {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id,
            course_title: course.info.course_title.clone(),
            course_price: course.info.course_price,
        }
    }
}

/// A purchase with its course resolved; `course` is `None` if the course was
/// deleted after the sale.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseWithCourse {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub course: Option<CourseSnippet>,
}
