use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use coursehub_core::document::{CourseId, LectureId};
use coursehub_core::services::lectures::{LectureEdit, NewLectureInput};
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/course/{course_id}/lecture",
            post(create_lecture).get(course_lectures),
        )
        .route("/course/{course_id}/lecture/{lecture_id}", post(edit_lecture))
        .route(
            "/course/lecture/{lecture_id}",
            get(get_lecture).delete(remove_lecture),
        )
}

async fn create_lecture(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(course_id): Path<String>,
    ApiJson(input): ApiJson<NewLectureInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let lecture = state
        .lectures()
        .create(&user, CourseId::parse(&course_id)?, input)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Lecture created successfully.",
            "lecture": lecture,
        })),
    ))
}

async fn course_lectures(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(course_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let lectures = state
        .lectures()
        .for_course(CourseId::parse(&course_id)?)
        .await?;
    Ok(Json(json!({ "success": true, "lectures": lectures })))
}

async fn edit_lecture(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((course_id, lecture_id)): Path<(String, String)>,
    ApiJson(edit): ApiJson<LectureEdit>,
) -> ApiResult<Json<Value>> {
    let lecture = state
        .lectures()
        .edit(
            &user,
            CourseId::parse(&course_id)?,
            LectureId::parse(&lecture_id)?,
            edit,
        )
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Lecture updated successfully.",
        "lecture": lecture,
    })))
}

async fn remove_lecture(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(lecture_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .lectures()
        .remove(&user, LectureId::parse(&lecture_id)?)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Lecture removed successfully.",
    })))
}

async fn get_lecture(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(lecture_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let lecture = state
        .lectures()
        .get(LectureId::parse(&lecture_id)?)
        .await?;
    Ok(Json(json!({ "success": true, "lecture": lecture })))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use coursehub_core::models::Role;
    use serde_json::json;

    use crate::routes::test_support::TestApp;

    #[tokio::test]
    async fn lecture_lifecycle() {
        let app = TestApp::new();
        let ivy = app.sign_up("ivy", Role::Instructor).await;

        let (_, body) = app
            .request(
                Method::POST,
                "/api/v1/course",
                ivy.cookie(),
                Some(json!({ "courseTitle": "Rust", "category": "Programming" })),
            )
            .await;
        let course_id = body["course"]["id"].as_str().unwrap().to_string();

        let (status, body) = app
            .request(
                Method::POST,
                &format!("/api/v1/course/{course_id}/lecture"),
                ivy.cookie(),
                Some(json!({ "lectureTitle": "Ownership" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let lecture_id = body["lecture"]["id"].as_str().unwrap().to_string();

        let (status, body) = app
            .request(
                Method::POST,
                &format!("/api/v1/course/{course_id}/lecture/{lecture_id}"),
                ivy.cookie(),
                Some(json!({
                    "lectureTitle": "Ownership and Borrowing",
                    "videoInfo": { "videoUrl": "https://cdn.example/v.mp4", "publicId": "v1" },
                    "isPreviewFree": true,
                    "duration": 42,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["lecture"]["lectureTitle"], "Ownership and Borrowing");
        assert_eq!(body["lecture"]["isPreviewFree"], true);

        let (_, body) = app
            .request(
                Method::GET,
                &format!("/api/v1/course/{course_id}/lecture"),
                ivy.cookie(),
                None,
            )
            .await;
        assert_eq!(body["lectures"].as_array().unwrap().len(), 1);

        let (status, _) = app
            .request(
                Method::DELETE,
                &format!("/api/v1/course/lecture/{lecture_id}"),
                ivy.cookie(),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app
            .request(
                Method::GET,
                &format!("/api/v1/course/lecture/{lecture_id}"),
                ivy.cookie(),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Lecture not found");

        let (_, body) = app
            .request(
                Method::GET,
                &format!("/api/v1/course/{course_id}/lecture"),
                ivy.cookie(),
                None,
            )
            .await;
        assert!(body["lectures"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn lecture_on_missing_course_is_not_found() {
        let app = TestApp::new();
        let ivy = app.sign_up("ivy", Role::Instructor).await;
        let (status, _) = app
            .request(
                Method::POST,
                &format!("/api/v1/course/{}/lecture", uuid::Uuid::nil()),
                ivy.cookie(),
                Some(json!({ "lectureTitle": "Orphan" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lecture_of_another_course_cannot_be_edited_through_yours() {
        let app = TestApp::new();
        let ivy = app.sign_up("ivy", Role::Instructor).await;
        let max = app.sign_up("max", Role::Instructor).await;

        let mut course_ids = Vec::new();
        for user in [&ivy, &max] {
            let (_, body) = app
                .request(
                    Method::POST,
                    "/api/v1/course",
                    user.cookie(),
                    Some(json!({ "courseTitle": "Rust", "category": "Programming" })),
                )
                .await;
            course_ids.push(body["course"]["id"].as_str().unwrap().to_string());
        }
        let (ivy_course, max_course) = (&course_ids[0], &course_ids[1]);

        let (_, body) = app
            .request(
                Method::POST,
                &format!("/api/v1/course/{max_course}/lecture"),
                max.cookie(),
                Some(json!({ "lectureTitle": "Lifetimes" })),
            )
            .await;
        let lecture_id = body["lecture"]["id"].as_str().unwrap().to_string();

        let (status, _) = app
            .request(
                Method::POST,
                &format!("/api/v1/course/{ivy_course}/lecture/{lecture_id}"),
                ivy.cookie(),
                Some(json!({ "lectureTitle": "Mine now" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, body) = app
            .request(
                Method::GET,
                &format!("/api/v1/course/lecture/{lecture_id}"),
                max.cookie(),
                None,
            )
            .await;
        assert_eq!(body["lecture"]["lectureTitle"], "Lifetimes");
    }
}
