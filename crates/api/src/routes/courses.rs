use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use coursehub_core::document::CourseId;
use coursehub_core::services::courses::{
    CourseEdit, CourseSearch, NewCourseInput, PriceOrder, ReviewInput,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/course", post(create_course).get(creator_courses))
        .route("/course/search", get(search_courses))
        .route("/course/published-courses", get(published_courses))
        .route(
            "/course/{course_id}",
            get(get_course).put(edit_course).patch(set_published),
        )
        .route("/course/{course_id}/detail-with-status", get(course_detail))
        .route("/course/{course_id}/review", post(submit_review))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    #[serde(default)]
    query: String,
    /// Comma separated.
    #[serde(default)]
    categories: String,
    /// `low` or `high`; anything else leaves store order.
    #[serde(default)]
    sort_by_price: String,
}

impl From<SearchParams> for CourseSearch {
    fn from(params: SearchParams) -> Self {
        let sort_by_price = match params.sort_by_price.as_str() {
            "low" => Some(PriceOrder::Low),
            "high" => Some(PriceOrder::High),
            _ => None,
        };
        CourseSearch {
            query: params.query,
            categories: params
                .categories
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect(),
            sort_by_price,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PublishParams {
    publish: Option<String>,
}

async fn create_course(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(input): ApiJson<NewCourseInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let course = state.courses().create(&user, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Course created.",
            "course": course,
        })),
    ))
}

async fn creator_courses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Value>> {
    let courses = state.courses().created_by(&user).await?;
    Ok(Json(json!({ "success": true, "courses": courses })))
}

async fn search_courses(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<Json<Value>> {
    let courses = state.courses().search(params.into()).await?;
    Ok(Json(json!({ "success": true, "courses": courses })))
}

async fn published_courses(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let courses = state.courses().published().await?;
    Ok(Json(json!({ "success": true, "courses": courses })))
}

async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let course = state.courses().get(CourseId::parse(&course_id)?).await?;
    Ok(Json(json!({ "success": true, "course": course })))
}

async fn edit_course(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(course_id): Path<String>,
    ApiJson(edit): ApiJson<CourseEdit>,
) -> ApiResult<Json<Value>> {
    let course = state
        .courses()
        .edit(&user, CourseId::parse(&course_id)?, edit)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Course updated successfully.",
        "course": course,
    })))
}

/// `?publish=true` publishes; any other value unpublishes.
async fn set_published(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(course_id): Path<String>,
    ApiQuery(params): ApiQuery<PublishParams>,
) -> ApiResult<Json<Value>> {
    let publish = params.publish.as_deref() == Some("true");
    state
        .courses()
        .set_published(&user, CourseId::parse(&course_id)?, publish)
        .await?;

    let message = if publish {
        "Course is published."
    } else {
        "Course is unpublished."
    };
    Ok(Json(json!({ "success": true, "message": message })))
}

async fn course_detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(course_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let detail = state
        .courses()
        .detail_with_status(&user, CourseId::parse(&course_id)?)
        .await?;
    Ok(Json(json!({
        "success": true,
        "course": detail.course,
        "purchased": detail.purchased,
    })))
}

async fn submit_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(course_id): Path<String>,
    ApiJson(input): ApiJson<ReviewInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let course = state
        .courses()
        .submit_review(&user, CourseId::parse(&course_id)?, input)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Review submitted successfully.",
            "rating": course.rating,
        })),
    ))
}
