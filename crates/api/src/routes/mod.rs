pub mod analytics;
pub mod courses;
pub mod health;
pub mod lectures;
pub mod purchases;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support;

use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::state::AppState;

/// Largest accepted request body. Media is uploaded elsewhere, so bodies
/// are small JSON documents.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(users::routes())
        .merge(courses::routes())
        .merge(lectures::routes())
        .merge(purchases::routes())
        .merge(analytics::routes());

    Router::new()
        .merge(health::routes())
        .nest("/api/v1", api)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}
