use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{update_existing, OrNotFound, ServiceResult};
use crate::access::{self, Capability};
use crate::document::validate::{non_blank, take_required};
use crate::document::{CourseId, UserId, ValidationError};
use crate::models::lecture::format_duration;
use crate::models::views::{
    CourseCard, CourseDetail, CourseWithReviews, InstructorProfile, ReviewView, UserSummary,
};
use crate::models::{
    mean_rating, Course, CourseInfo, CourseLevel, Lecture, Purchase, Review, User,
};
use crate::store::Repository;

const DEFAULT_PROFESSION: &str = "Instructor";
const DEFAULT_BIO: &str = "This instructor has not provided a bio yet.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourseInput {
    pub course_title: Option<String>,
    pub category: Option<String>,
}

/// Fields to change on a course; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseEdit {
    pub course_title: Option<String>,
    pub sub_title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub course_level: Option<CourseLevel>,
    pub course_price: Option<f64>,
    /// URL of an already-hosted image.
    pub course_thumbnail: Option<String>,
    pub learning_outcomes: Option<Vec<String>>,
    pub requirements: Option<Vec<String>>,
    pub includes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceOrder {
    Low,
    High,
}

#[derive(Debug, Clone, Default)]
pub struct CourseSearch {
    pub query: String,
    pub categories: Vec<String>,
    pub sort_by_price: Option<PriceOrder>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewInput {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

/// A course page plus whether the viewer has bought it.
#[derive(Debug, Clone, Serialize)]
pub struct CourseDetailWithStatus {
    pub course: CourseDetail,
    pub purchased: bool,
}

#[derive(Debug, Clone)]
pub struct CourseService {
    repo: Repository,
}

impl CourseService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn create(&self, caller: &User, input: NewCourseInput) -> ServiceResult<Course> {
        access::require(caller, Capability::AuthorCourses)?;
        let [course_title, category] = take_required([
            ("courseTitle", input.course_title),
            ("category", input.category),
        ])?;

        let course = Course::new(
            course_title.trim().to_string(),
            category.trim().to_string(),
            caller.id,
        );
        self.repo.insert(&course).await?;

        tracing::info!(course_id = %course.id, creator = %caller.id, "course created");
        Ok(course)
    }

    /// Published courses matching `search`, creators resolved.
    pub async fn search(&self, search: CourseSearch) -> ServiceResult<Vec<CourseCard>> {
        let needle = search.query.trim().to_lowercase();
        let mut courses: Vec<Course> = self
            .repo
            .find::<Course>(json!({ "isPublished": true }))
            .await?
            .into_iter()
            .filter(|c| matches_query(c, &needle))
            .filter(|c| search.categories.is_empty() || search.categories.contains(&c.info.category))
            .collect();

        match search.sort_by_price {
            Some(PriceOrder::Low) => courses.sort_by(|a, b| a.price().total_cmp(&b.price())),
            Some(PriceOrder::High) => courses.sort_by(|a, b| b.price().total_cmp(&a.price())),
            None => {}
        }

        self.with_creators(courses).await
    }

    pub async fn published(&self) -> ServiceResult<Vec<CourseCard>> {
        let courses = self.repo.find::<Course>(json!({ "isPublished": true })).await?;
        self.with_creators(courses).await
    }

    pub async fn created_by(&self, caller: &User) -> ServiceResult<Vec<Course>> {
        Ok(self.repo.find::<Course>(json!({ "creator": caller.id })).await?)
    }

    pub async fn get(&self, id: CourseId) -> ServiceResult<CourseWithReviews> {
        let course = self.load(id).await?;
        let reviews = self.resolve_reviews(&course.reviews).await?;
        Ok(CourseWithReviews::new(course, reviews))
    }

    pub async fn edit(&self, caller: &User, id: CourseId, edit: CourseEdit) -> ServiceResult<Course> {
        update_existing(&self.repo, id, "Course", |course: &mut Course| {
            access::require_course_manager(caller, course)?;
            if edit.course_price.is_some_and(|p| p < 0.0) {
                return Err(ValidationError::NegativePrice.into());
            }
            edit.apply(&mut course.info);
            Ok(())
        })
        .await
    }

    pub async fn set_published(
        &self,
        caller: &User,
        id: CourseId,
        publish: bool,
    ) -> ServiceResult<Course> {
        let course = update_existing(&self.repo, id, "Course", |course: &mut Course| {
            access::require_course_manager(caller, course)?;
            course.is_published = publish;
            Ok(())
        })
        .await?;

        tracing::info!(course_id = %course.id, published = publish, "course visibility changed");
        Ok(course)
    }

    /// Add or replace the caller's review and recompute the course rating.
    pub async fn submit_review(
        &self,
        caller: &User,
        id: CourseId,
        input: ReviewInput,
    ) -> ServiceResult<Course> {
        let (rating, comment) = match (input.rating, non_blank(input.comment)) {
            (Some(rating), Some(comment)) => (rating, comment),
            (rating, comment) => {
                let missing = [("rating", rating.is_none()), ("comment", comment.is_none())]
                    .into_iter()
                    .filter_map(|(field, absent)| absent.then_some(field))
                    .collect();
                return Err(ValidationError::MissingFields(missing).into());
            }
        };
        let rating = u8::try_from(rating).map_err(|_| ValidationError::RatingOutOfRange)?;

        let course = update_existing(&self.repo, id, "Course", |course: &mut Course| {
            course.upsert_review(caller.id, rating, comment.clone())?;
            Ok(())
        })
        .await?;

        tracing::info!(course_id = %course.id, reviewer = %caller.id, rating, "review submitted");
        Ok(course)
    }

    pub async fn detail_with_status(
        &self,
        caller: &User,
        id: CourseId,
    ) -> ServiceResult<CourseDetailWithStatus> {
        let course = self.load(id).await?;

        let mut lectures = Vec::with_capacity(course.lectures.len());
        for lecture_id in &course.lectures {
            if let Some(lecture) = self.repo.get::<Lecture>(*lecture_id).await? {
                lectures.push(lecture);
            }
        }
        let total_minutes: u64 = lectures
            .iter()
            .map(|l| u64::from(l.duration.unwrap_or(0)))
            .sum();

        let reviews = self.resolve_reviews(&course.reviews).await?;
        let creator = self.instructor_profile(course.creator).await?;

        let purchased = self
            .repo
            .find_one::<Purchase>(json!({
                "userId": caller.id,
                "courseId": course.id,
                "status": "completed",
            }))
            .await?
            .is_some();

        let detail = CourseDetail {
            id: course.id,
            info: course.info,
            creator,
            instructor: course.instructor,
            lectures,
            is_published: course.is_published,
            reviews,
            rating: course.rating,
            enrolled_students: course.enrolled_students,
            duration: format_duration(total_minutes),
            created_at: course.created_at,
            updated_at: course.updated_at,
        };

        Ok(CourseDetailWithStatus {
            course: detail,
            purchased,
        })
    }

    /// Teaching stats across every course `creator` has authored.
    async fn instructor_profile(&self, creator: UserId) -> ServiceResult<Option<InstructorProfile>> {
        let Some(user) = self.repo.get::<User>(creator).await? else {
            return Ok(None);
        };

        let courses = self.repo.find::<Course>(json!({ "creator": creator })).await?;
        let course_ids: HashSet<CourseId> = courses.iter().map(|c| c.id).collect();

        let total_students = self
            .repo
            .find::<Purchase>(json!({ "status": "completed" }))
            .await?
            .iter()
            .filter(|p| course_ids.contains(&p.course_id))
            .count();

        let ratings: Vec<u8> = courses
            .iter()
            .flat_map(|c| c.reviews.iter().map(|r| r.rating))
            .collect();

        Ok(Some(InstructorProfile {
            summary: UserSummary::from(&user),
            profession: user
                .profession
                .clone()
                .unwrap_or_else(|| DEFAULT_PROFESSION.to_string()),
            bio: user.bio.clone().unwrap_or_else(|| DEFAULT_BIO.to_string()),
            total_courses: courses.len(),
            total_students,
            total_reviews: ratings.len(),
            rating: mean_rating(ratings),
        }))
    }

    async fn resolve_reviews(&self, reviews: &[Review]) -> ServiceResult<Vec<ReviewView>> {
        let mut summaries = SummaryCache::default();
        let mut resolved = Vec::with_capacity(reviews.len());
        for review in reviews {
            resolved.push(ReviewView {
                user: summaries.get(&self.repo, review.user).await?,
                rating: review.rating,
                comment: review.comment.clone(),
            });
        }
        Ok(resolved)
    }

    async fn with_creators(&self, courses: Vec<Course>) -> ServiceResult<Vec<CourseCard>> {
        let mut summaries = SummaryCache::default();
        let mut cards = Vec::with_capacity(courses.len());
        for course in courses {
            let creator = summaries.get(&self.repo, course.creator).await?;
            cards.push(CourseCard::new(course, creator));
        }
        Ok(cards)
    }

    async fn load(&self, id: CourseId) -> ServiceResult<Course> {
        self.repo.get::<Course>(id).await?.or_not_found("Course")
    }
}

impl CourseEdit {
    fn apply(&self, info: &mut CourseInfo) {
        if let Some(title) = filled(&self.course_title) {
            info.course_title = title.to_string();
        }
        if let Some(category) = filled(&self.category) {
            info.category = category.to_string();
        }
        if let Some(sub_title) = &self.sub_title {
            info.sub_title = Some(sub_title.clone());
        }
        if let Some(description) = &self.description {
            info.description = Some(description.clone());
        }
        if let Some(level) = self.course_level {
            info.course_level = Some(level);
        }
        if let Some(price) = self.course_price {
            info.course_price = Some(price);
        }
        if let Some(thumbnail) = filled(&self.course_thumbnail) {
            info.course_thumbnail = Some(thumbnail.to_string());
        }
        if let Some(outcomes) = &self.learning_outcomes {
            info.learning_outcomes = outcomes.clone();
        }
        if let Some(requirements) = &self.requirements {
            info.requirements = requirements.clone();
        }
        if let Some(includes) = &self.includes {
            info.includes = includes.clone();
        }
    }
}

/// Trimmed `value`, unless it is absent or blank.
fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn matches_query(course: &Course, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let info = &course.info;
    [
        Some(info.course_title.as_str()),
        info.sub_title.as_deref(),
        Some(info.category.as_str()),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Per-request memo of user summaries.
#[derive(Default)]
struct SummaryCache {
    seen: HashMap<UserId, Option<UserSummary>>,
}

impl SummaryCache {
    async fn get(&mut self, repo: &Repository, id: UserId) -> ServiceResult<Option<UserSummary>> {
        if let Some(summary) = self.seen.get(&id) {
            return Ok(summary.clone());
        }
        let summary = repo.get::<User>(id).await?.as_ref().map(UserSummary::from);
        self.seen.insert(id, summary.clone());
        Ok(summary)
    }
}
