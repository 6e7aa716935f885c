//! Operations behind the HTTP routes.
//!
//! Each service owns a [`Repository`](crate::store::Repository) handle and
//! performs one request's worth of validation, authorization, reads and
//! writes.

pub mod courses;
pub mod lectures;
pub mod purchases;
pub mod users;

use thiserror::Error;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::document::{Document, ValidationError};
use crate::store::{Repository, StoreError};

pub use courses::CourseService;
pub use lectures::LectureService;
pub use purchases::PurchaseService;
pub use users::UserService;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("User already exists")]
    EmailTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("You already purchased this course.")]
    AlreadyPurchased,

    #[error("Cannot delete self")]
    SelfDeletion,

    /// No valid session, or the session's user is gone.
    #[error("Authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Shorthand for turning a missing document into `NotFound`.
pub(crate) trait OrNotFound<T> {
    fn or_not_found(self, what: &'static str) -> ServiceResult<T>;
}

impl<T> OrNotFound<T> for Option<T> {
    fn or_not_found(self, what: &'static str) -> ServiceResult<T> {
        self.ok_or(ServiceError::NotFound(what))
    }
}

/// [`Repository::update`] with a missing document reported as
/// `NotFound(what)`.
pub(crate) async fn update_existing<T, F>(
    repo: &Repository,
    id: impl Into<Uuid>,
    what: &'static str,
    apply: F,
) -> ServiceResult<T>
where
    T: Document,
    F: FnMut(&mut T) -> ServiceResult<()>,
{
    repo.update(id, apply).await?.or_not_found(what)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::{Course, Role, User};
    use crate::store::Repository;

    /// A stored user whose password hash never verifies; sign-in tests go
    /// through `UserService::register` instead.
    pub async fn user(repo: &Repository, name: &str, role: Role) -> User {
        let user = User::new(name.into(), format!("{name}@example.com"), "unusable".into())
            .with_role(role);
        repo.insert(&user).await.unwrap();
        user
    }

    pub async fn course(repo: &Repository, title: &str, creator: &User, price: f64) -> Course {
        let mut course = Course::new(title.into(), "Programming".into(), creator.id);
        course.info.course_price = Some(price);
        course.is_published = true;
        repo.insert(&course).await.unwrap();
        course
    }
}
