//! Role capability checks.
//!
//! Authorization is decided per request from the caller's stored role. There
//! is no role hierarchy: each capability lists the roles that hold it.

use crate::models::{Course, Role, User};
use crate::services::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// List users, change roles, delete accounts.
    ManagePlatform,
    /// Create courses and lectures, keep an instructor profile.
    AuthorCourses,
    ViewOwnerAnalytics,
}

impl Capability {
    fn denial(&self) -> &'static str {
        match self {
            Capability::ManagePlatform | Capability::ViewOwnerAnalytics => "Owner access only",
            Capability::AuthorCourses => "Instructor access only",
        }
    }
}

impl Role {
    pub fn can(&self, capability: Capability) -> bool {
        match capability {
            Capability::ManagePlatform | Capability::ViewOwnerAnalytics => *self == Role::Owner,
            Capability::AuthorCourses => matches!(self, Role::Owner | Role::Instructor),
        }
    }
}

/// Fail with `Forbidden` unless `user` holds `capability`.
pub fn require(user: &User, capability: Capability) -> Result<(), ServiceError> {
    if user.role.can(capability) {
        Ok(())
    } else {
        tracing::debug!(user_id = %user.id, role = %user.role, ?capability, "capability denied");
        Err(ServiceError::Forbidden(capability.denial()))
    }
}

/// Course creators manage their own courses; owners manage every course.
pub fn require_course_manager(user: &User, course: &Course) -> Result<(), ServiceError> {
    if user.is_owner() || course.creator == user.id {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("Only the course creator can modify this course"))
    }
}
