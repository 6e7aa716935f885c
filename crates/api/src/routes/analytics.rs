use axum::{extract::State, routing::get, Json, Router};
use coursehub_core::analytics::OwnerAnalytics;
use serde::Serialize;

use crate::error::ApiResult;
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/analytics/owner", get(owner_analytics))
}

#[derive(Serialize)]
struct OwnerAnalyticsResponse {
    success: bool,
    #[serde(flatten)]
    report: OwnerAnalytics,
}

async fn owner_analytics(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<OwnerAnalyticsResponse>> {
    let report = state.analytics().owner_report(&user).await?;
    Ok(Json(OwnerAnalyticsResponse {
        success: true,
        report,
    }))
}
