use std::sync::Arc;

use coursehub_core::analytics::AnalyticsService;
use coursehub_core::auth::SessionTokens;
use coursehub_core::services::{CourseService, LectureService, PurchaseService, UserService};
use coursehub_core::store::Repository;

use crate::config::AppConfig;

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    repo: Repository,
    config: AppConfig,
    users: UserService,
    courses: CourseService,
    lectures: LectureService,
    purchases: PurchaseService,
    analytics: AnalyticsService,
}

impl AppState {
    pub fn new(repo: Repository, config: AppConfig) -> Self {
        let tokens = SessionTokens::new(&config.secret_key, config.token_ttl());
        Self {
            inner: Arc::new(InnerState {
                users: UserService::new(repo.clone(), tokens),
                courses: CourseService::new(repo.clone()),
                lectures: LectureService::new(repo.clone()),
                purchases: PurchaseService::new(repo.clone()),
                analytics: AnalyticsService::new(repo.clone()),
                repo,
                config,
            }),
        }
    }

    pub fn repo(&self) -> &Repository {
        &self.inner.repo
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn users(&self) -> &UserService {
        &self.inner.users
    }

    pub fn courses(&self) -> &CourseService {
        &self.inner.courses
    }

    pub fn lectures(&self) -> &LectureService {
        &self.inner.lectures
    }

    pub fn purchases(&self) -> &PurchaseService {
        &self.inner.purchases
    }

    pub fn analytics(&self) -> &AnalyticsService {
        &self.inner.analytics
    }
}
