use serde::Deserialize;
use serde_json::json;

use super::{update_existing, OrNotFound, ServiceError, ServiceResult};
use crate::access;
use crate::document::validate::{non_blank, take_required};
use crate::document::{CourseId, LectureId};
use crate::models::{Course, Lecture, User};
use crate::store::Repository;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLectureInput {
    pub lecture_title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub video_url: Option<String>,
    pub public_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LectureEdit {
    pub lecture_title: Option<String>,
    pub video_info: Option<VideoInfo>,
    pub is_preview_free: Option<bool>,
    /// Minutes.
    pub duration: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct LectureService {
    repo: Repository,
}

impl LectureService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create a lecture and append it to the course's lecture list.
    pub async fn create(
        &self,
        caller: &User,
        course_id: CourseId,
        input: NewLectureInput,
    ) -> ServiceResult<Lecture> {
        let [title] = take_required([("lectureTitle", input.lecture_title)])?;

        let course = self.course(course_id).await?;
        access::require_course_manager(caller, &course)?;

        let lecture = Lecture::new(title.trim().to_string());
        self.repo.insert(&lecture).await?;

        let course = self.attach(course.id, lecture.id).await?;

        tracing::info!(lecture_id = %lecture.id, course_id = %course.id, "lecture created");
        Ok(lecture)
    }

    /// The course's lectures in course order.
    pub async fn for_course(&self, course_id: CourseId) -> ServiceResult<Vec<Lecture>> {
        let course = self.course(course_id).await?;

        let mut lectures = Vec::with_capacity(course.lectures.len());
        for id in &course.lectures {
            if let Some(lecture) = self.repo.get::<Lecture>(*id).await? {
                lectures.push(lecture);
            }
        }
        Ok(lectures)
    }

    /// Apply `edit`, re-attaching the lecture to the course if it had been
    /// dropped from the course's list. A lecture listed by another course
    /// cannot be edited through this one.
    pub async fn edit(
        &self,
        caller: &User,
        course_id: CourseId,
        lecture_id: LectureId,
        edit: LectureEdit,
    ) -> ServiceResult<Lecture> {
        let course = self.course(course_id).await?;
        access::require_course_manager(caller, &course)?;
        self.lecture(lecture_id).await?;

        if let Some(owning) = self.owning_course(lecture_id).await? {
            if owning.id != course.id {
                return Err(ServiceError::Forbidden("Lecture does not belong to this course"));
            }
        }

        let title = non_blank(edit.lecture_title);
        let (video_url, public_id) = match edit.video_info {
            Some(video) => (non_blank(video.video_url), non_blank(video.public_id)),
            None => (None, None),
        };

        let lecture = update_existing(&self.repo, lecture_id, "Lecture", |lecture: &mut Lecture| {
            if let Some(title) = &title {
                lecture.lecture_title = title.trim().to_string();
            }
            if let Some(url) = &video_url {
                lecture.video_url = Some(url.clone());
            }
            if let Some(public_id) = &public_id {
                lecture.public_id = Some(public_id.clone());
            }
            if let Some(free) = edit.is_preview_free {
                lecture.is_preview_free = free;
            }
            if let Some(duration) = edit.duration {
                lecture.duration = Some(duration);
            }
            Ok(())
        })
        .await?;

        if !course.lectures.contains(&lecture.id) {
            self.attach(course.id, lecture.id).await?;
        }
        Ok(lecture)
    }

    /// Delete a lecture and pull it from whichever course lists it.
    pub async fn remove(&self, caller: &User, lecture_id: LectureId) -> ServiceResult<Lecture> {
        let lecture = self.lecture(lecture_id).await?;

        match self.owning_course(lecture_id).await? {
            Some(course) => {
                access::require_course_manager(caller, &course)?;
                update_existing(&self.repo, course.id, "Course", |course: &mut Course| {
                    course.detach_lecture(lecture_id);
                    Ok(())
                })
                .await?;
            }
            None => access::require(caller, access::Capability::AuthorCourses)?,
        }

        self.repo.delete::<Lecture>(lecture_id).await?;
        if let Some(public_id) = &lecture.public_id {
            tracing::info!(
                lecture_id = %lecture_id,
                public_id = %public_id,
                "lecture removed; hosted video left for media cleanup"
            );
        } else {
            tracing::info!(lecture_id = %lecture_id, "lecture removed");
        }
        Ok(lecture)
    }

    pub async fn get(&self, lecture_id: LectureId) -> ServiceResult<Lecture> {
        self.lecture(lecture_id).await
    }

    async fn course(&self, id: CourseId) -> ServiceResult<Course> {
        self.repo.get::<Course>(id).await?.or_not_found("Course")
    }

    async fn lecture(&self, id: LectureId) -> ServiceResult<Lecture> {
        self.repo.get::<Lecture>(id).await?.or_not_found("Lecture")
    }

    /// The course whose lecture list names `lecture_id`, if any.
    async fn owning_course(&self, lecture_id: LectureId) -> ServiceResult<Option<Course>> {
        Ok(self
            .repo
            .find_one::<Course>(json!({ "lectures": [lecture_id] }))
            .await?)
    }

    async fn attach(&self, course_id: CourseId, lecture_id: LectureId) -> ServiceResult<Course> {
        update_existing(&self.repo, course_id, "Course", |course: &mut Course| {
            course.attach_lecture(lecture_id);
            Ok(())
        })
        .await
    }
}
