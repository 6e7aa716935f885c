use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{Collection, CourseId, Document, LectureId, UserId, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourseLevel {
    Beginner,
    Medium,
    Advance,
}

/// Descriptive fields of a course, editable by its creator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInfo {
    pub course_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_level: Option<CourseLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_thumbnail: Option<String>,
    #[serde(default)]
    pub learning_outcomes: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub includes: Vec<String>,
}

/// One learner's review. A course holds at most one per reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub user: UserId,
    pub rating: u8,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    #[serde(flatten)]
    pub info: CourseInfo,
    pub creator: UserId,
    /// Instructor credited with the course's revenue. Older documents may
    /// lack it.
    #[serde(default)]
    pub instructor: Option<UserId>,
    #[serde(default)]
    pub lectures: Vec<LectureId>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub enrolled_students: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// A new unpublished course authored and taught by `creator`.
    pub fn new(course_title: String, category: String, creator: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: CourseId::new(),
            info: CourseInfo {
                course_title,
                category,
                ..CourseInfo::default()
            },
            creator,
            instructor: Some(creator),
            lectures: Vec::new(),
            is_published: false,
            reviews: Vec::new(),
            rating: 0.0,
            enrolled_students: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn title(&self) -> &str {
        &self.info.course_title
    }

    pub fn price(&self) -> f64 {
        self.info.course_price.unwrap_or(0.0)
    }

    /// Add or replace `reviewer`'s review, then recompute the rating.
    pub fn upsert_review(
        &mut self,
        reviewer: UserId,
        rating: u8,
        comment: String,
    ) -> Result<(), ValidationError> {
        if !(1..=5).contains(&rating) {
            return Err(ValidationError::RatingOutOfRange);
        }

        match self.reviews.iter_mut().find(|r| r.user == reviewer) {
            Some(existing) => {
                existing.rating = rating;
                existing.comment = comment;
            }
            None => self.reviews.push(Review {
                user: reviewer,
                rating,
                comment,
            }),
        }

        self.rating = mean_rating(self.reviews.iter().map(|r| r.rating));
        Ok(())
    }

    /// Returns `false` if the lecture was already attached.
    pub fn attach_lecture(&mut self, lecture: LectureId) -> bool {
        if self.lectures.contains(&lecture) {
            return false;
        }
        self.lectures.push(lecture);
        true
    }

    pub fn detach_lecture(&mut self, lecture: LectureId) -> bool {
        let before = self.lectures.len();
        self.lectures.retain(|l| *l != lecture);
        self.lectures.len() != before
    }

    /// Returns `false` if the student was already enrolled.
    pub fn enroll(&mut self, student: UserId) -> bool {
        if self.enrolled_students.contains(&student) {
            return false;
        }
        self.enrolled_students.push(student);
        true
    }
}

impl Document for Course {
    const COLLECTION: Collection = Collection::Courses;

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

/// Arithmetic mean of `ratings` rounded to one decimal; 0 when empty.
pub fn mean_rating(ratings: impl IntoIterator<Item = u8>) -> f64 {
    let (sum, count) = ratings
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), r| (sum + u64::from(r), count + 1));

    if count == 0 {
        return 0.0;
    }

    let mean = sum as f64 / count as f64;
    (mean * 10.0).round() / 10.0
}
