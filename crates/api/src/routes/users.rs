use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use coursehub_core::document::UserId;
use coursehub_core::services::users::{
    InstructorProfileUpdate, LoginInput, ProfileUpdate, RegisterInput, RoleUpdate,
};
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::session::{cleared_session_cookie, session_cookie, CurrentUser};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/register", post(register))
        .route("/user/login", post(login))
        .route("/user/logout", get(logout))
        .route("/user/profile", get(profile))
        .route("/user/profile/update", put(update_profile))
        .route(
            "/user/instructor/update-profile",
            patch(update_instructor_profile),
        )
        .route("/user/owner/users", get(list_users))
        .route("/user/owner/update-role", put(update_role))
        .route("/user/owner/delete/{user_id}", delete(delete_user))
}

async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user = state.users().register(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Account created successfully.",
            "user": user,
        })),
    ))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(input): ApiJson<LoginInput>,
) -> ApiResult<(CookieJar, Json<Value>)> {
    let outcome = state.users().login(input).await?;
    let jar = jar.add(session_cookie(state.config(), outcome.token));

    Ok((
        jar,
        Json(json!({
            "success": true,
            "message": format!("Welcome back {}", outcome.user.name),
            "user": outcome.user,
        })),
    ))
}

/// Clears the cookie; needs no valid session.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    (
        jar.add(cleared_session_cookie(state.config())),
        Json(json!({
            "success": true,
            "message": "Logged out successfully.",
        })),
    )
}

async fn profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Value>> {
    let profile = state.users().profile(&user).await?;
    Ok(Json(json!({
        "success": true,
        "user": profile.user,
        "enrolledCourses": profile.enrolled_courses,
    })))
}

async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<Value>> {
    let user = state.users().update_profile(&user, update).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully.",
        "user": user,
    })))
}

async fn update_instructor_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(update): ApiJson<InstructorProfileUpdate>,
) -> ApiResult<Json<Value>> {
    let user = state
        .users()
        .update_instructor_profile(&user, update)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Instructor profile updated successfully.",
        "user": user,
    })))
}

async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Value>> {
    let users = state.users().list_users(&user).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Users fetched successfully.",
        "users": users,
    })))
}

async fn update_role(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(update): ApiJson<RoleUpdate>,
) -> ApiResult<Json<Value>> {
    let user = state.users().update_role(&user, update).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Role updated successfully.",
        "user": user,
    })))
}

async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let target = UserId::parse(&user_id)?;
    state.users().delete_user(&user, target).await?;
    Ok(Json(json!({
        "success": true,
        "message": "User deleted successfully.",
    })))
}
