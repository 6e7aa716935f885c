use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use coursehub_core::document::CourseId;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/purchase", get(my_purchases))
        .route("/purchase/{course_id}", post(purchase_course))
        .route("/instructor/dashboard", get(instructor_dashboard))
}

/// Simulated checkout: completes immediately and enrolls the buyer.
async fn purchase_course(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(course_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let purchase = state
        .purchases()
        .purchase(&user, CourseId::parse(&course_id)?)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Payment successful. You are now enrolled!",
        "purchase": purchase,
    })))
}

async fn my_purchases(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Value>> {
    let purchases = state.purchases().for_buyer(&user).await?;
    Ok(Json(json!({ "success": true, "purchasedCourse": purchases })))
}

async fn instructor_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Value>> {
    let sales = state.purchases().instructor_sales(&user).await?;
    Ok(Json(json!({ "success": true, "purchasedCourse": sales })))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use coursehub_core::models::{Course, Role};

    use crate::routes::test_support::TestApp;

    async fn published_course(app: &TestApp, creator: &coursehub_core::models::User) -> Course {
        let mut course = Course::new("Rust".into(), "Programming".into(), creator.id);
        course.info.course_price = Some(49.0);
        course.is_published = true;
        app.state.repo().insert(&course).await.unwrap();
        course
    }

    #[tokio::test]
    async fn purchase_enrolls_once() {
        let app = TestApp::new();
        let ivy = app.sign_up("ivy", Role::Instructor).await;
        let sam = app.sign_up("sam", Role::Student).await;
        let course = published_course(&app, &ivy.user).await;
        let uri = format!("/api/v1/purchase/{}", course.id);

        let (status, body) = app.request(Method::POST, &uri, sam.cookie(), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["purchase"]["status"], "completed");
        assert_eq!(body["purchase"]["amount"], 49.0);

        let (status, body) = app.request(Method::POST, &uri, sam.cookie(), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "You already purchased this course.");

        let (_, body) = app
            .request(Method::GET, "/api/v1/purchase", sam.cookie(), None)
            .await;
        let purchases = body["purchasedCourse"].as_array().unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0]["course"]["courseTitle"], "Rust");

        let (_, body) = app
            .request(Method::GET, "/api/v1/user/profile", sam.cookie(), None)
            .await;
        assert_eq!(body["enrolledCourses"][0]["courseTitle"], "Rust");
    }

    #[tokio::test]
    async fn purchasing_a_missing_course_is_not_found() {
        let app = TestApp::new();
        let sam = app.sign_up("sam", Role::Student).await;
        let (status, _) = app
            .request(
                Method::POST,
                &format!("/api/v1/purchase/{}", uuid::Uuid::nil()),
                sam.cookie(),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn dashboard_is_for_instructors() {
        let app = TestApp::new();
        let ivy = app.sign_up("ivy", Role::Instructor).await;
        let sam = app.sign_up("sam", Role::Student).await;
        let course = published_course(&app, &ivy.user).await;
        app.request(
            Method::POST,
            &format!("/api/v1/purchase/{}", course.id),
            sam.cookie(),
            None,
        )
        .await;

        let (status, _) = app
            .request(Method::GET, "/api/v1/instructor/dashboard", sam.cookie(), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app
            .request(Method::GET, "/api/v1/instructor/dashboard", ivy.cookie(), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["purchasedCourse"].as_array().unwrap().len(), 1);
    }
}
