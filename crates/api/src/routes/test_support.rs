//! In-process router harness backed by the memory store.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use coursehub_core::auth::hash_password;
use coursehub_core::document::UserId;
use coursehub_core::models::{Role, User};
use coursehub_core::store::Repository;
use serde_json::Value;
use tower::ServiceExt;

use super::build_router;
use crate::config::AppConfig;
use crate::state::AppState;

pub const PASSWORD: &str = "correct horse";

pub struct TestApp {
    router: Router,
    pub state: AppState,
}

/// A stored user plus a cookie header carrying a valid session for them.
pub struct Session {
    pub id: UserId,
    pub user: User,
    header: String,
}

impl Session {
    pub fn cookie(&self) -> Option<&str> {
        Some(&self.header)
    }
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::new(Repository::in_memory(), AppConfig::for_tests());
        Self {
            router: build_router(state.clone()),
            state,
        }
    }

    /// Store a user with `role` directly and mint a session for them;
    /// owners and instructors cannot be created over HTTP.
    pub async fn sign_up(&self, name: &str, role: Role) -> Session {
        let user = User::new(
            name.to_string(),
            format!("{name}@example.com"),
            hash_password(PASSWORD).unwrap(),
        )
        .with_role(role);
        self.state.repo().insert(&user).await.unwrap();

        let token = self.state.users().tokens().issue(user.id).unwrap();
        Session {
            id: user.id,
            user,
            header: format!("token={token}"),
        }
    }

    pub async fn raw(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        self.raw_body(method, uri, cookie, &body).await
    }

    pub async fn raw_body(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: &str,
    ) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        if !body.is_empty() {
            request = request.header(header::CONTENT_TYPE, "application/json");
        }
        self.router
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }

    /// Send a request and decode the JSON response body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.raw(method, uri, cookie, body).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}
