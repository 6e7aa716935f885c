use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{update_existing, OrNotFound, ServiceError, ServiceResult};
use crate::access::{self, Capability};
use crate::auth::{hash_password, verify_password, SessionTokens};
use crate::document::validate::{non_blank, take_required};
use crate::document::{UserId, ValidationError};
use crate::models::{Course, PublicUser, Role, User};
use crate::store::{Repository, StoreError, USER_EMAIL_INDEX};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    /// URL of an already-hosted image.
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstructorProfileUpdate {
    pub profession: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleUpdate {
    pub user_id: Option<String>,
    pub role: Option<String>,
}

/// A successful sign-in: the user and their fresh session token.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: PublicUser,
    pub token: String,
}

/// The signed-in user with enrolled courses resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user: PublicUser,
    pub enrolled_courses: Vec<Course>,
}

#[derive(Debug, Clone)]
pub struct UserService {
    repo: Repository,
    tokens: SessionTokens,
}

impl UserService {
    pub fn new(repo: Repository, tokens: SessionTokens) -> Self {
        Self { repo, tokens }
    }

    pub fn tokens(&self) -> &SessionTokens {
        &self.tokens
    }

    pub async fn register(&self, input: RegisterInput) -> ServiceResult<PublicUser> {
        let [name, email, password] = take_required([
            ("name", input.name),
            ("email", input.email),
            ("password", input.password),
        ])?;

        let email = normalize_email(&email);
        if self.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::EmailTaken);
        }

        let user = User::new(name.trim().to_string(), email, hash_password(&password)?);
        match self.repo.insert(&user).await {
            Ok(()) => {}
            // Lost a race with a concurrent registration of the same email.
            Err(StoreError::Unique { constraint, .. }) if constraint == USER_EMAIL_INDEX => {
                return Err(ServiceError::EmailTaken)
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = %user.id, "user registered");
        Ok(PublicUser::from(user))
    }

    pub async fn login(&self, input: LoginInput) -> ServiceResult<LoginOutcome> {
        let [email, password] =
            take_required([("email", input.email), ("password", input.password)])?;

        let user = self
            .find_by_email(&normalize_email(&email))
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if !verify_password(&password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "password mismatch");
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id)?;
        Ok(LoginOutcome {
            user: PublicUser::from(user),
            token,
        })
    }

    /// Resolve a session token to the user it was issued for.
    pub async fn authenticate(&self, token: &str) -> ServiceResult<User> {
        let user_id = self.tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "session token rejected");
            ServiceError::Unauthenticated
        })?;

        self.repo
            .get::<User>(user_id)
            .await?
            .ok_or(ServiceError::Unauthenticated)
    }

    pub async fn profile(&self, caller: &User) -> ServiceResult<UserProfile> {
        let mut enrolled_courses = Vec::with_capacity(caller.enrolled_courses.len());
        for course_id in &caller.enrolled_courses {
            if let Some(course) = self.repo.get::<Course>(*course_id).await? {
                enrolled_courses.push(course);
            }
        }

        Ok(UserProfile {
            user: PublicUser::from(caller),
            enrolled_courses,
        })
    }

    pub async fn update_profile(
        &self,
        caller: &User,
        update: ProfileUpdate,
    ) -> ServiceResult<PublicUser> {
        let name = non_blank(update.name).map(|name| name.trim().to_string());
        let photo_url = non_blank(update.photo_url);

        let user = update_existing(&self.repo, caller.id, "User", |user: &mut User| {
            if let Some(name) = &name {
                user.name = name.clone();
            }
            if let Some(photo_url) = &photo_url {
                user.photo_url = photo_url.clone();
            }
            Ok(())
        })
        .await?;
        Ok(PublicUser::from(user))
    }

    /// Blank fields keep their previous value.
    pub async fn update_instructor_profile(
        &self,
        caller: &User,
        update: InstructorProfileUpdate,
    ) -> ServiceResult<PublicUser> {
        access::require(caller, Capability::AuthorCourses)?;

        let profession = non_blank(update.profession);
        let bio = non_blank(update.bio);

        let user = update_existing(&self.repo, caller.id, "User", |user: &mut User| {
            if profession.is_some() {
                user.profession = profession.clone();
            }
            if bio.is_some() {
                user.bio = bio.clone();
            }
            Ok(())
        })
        .await?;
        Ok(PublicUser::from(user))
    }

    pub async fn list_users(&self, caller: &User) -> ServiceResult<Vec<PublicUser>> {
        access::require(caller, Capability::ManagePlatform)?;

        let users = self.repo.all::<User>().await?;
        Ok(users.iter().map(PublicUser::from).collect())
    }

    /// Move a user between the student and instructor roles. Owners can be
    /// neither created nor demoted this way.
    pub async fn update_role(&self, caller: &User, update: RoleUpdate) -> ServiceResult<PublicUser> {
        access::require(caller, Capability::ManagePlatform)?;

        let [user_id, role] =
            take_required([("userId", update.user_id), ("role", update.role)])?;

        let user_id = UserId::parse(&user_id)?;
        let role: Role = role.parse()?;
        if role == Role::Owner {
            return Err(ValidationError::UnassignableRole.into());
        }

        let mut previous = role;
        let target = update_existing(&self.repo, user_id, "User", |target: &mut User| {
            if target.is_owner() {
                return Err(ServiceError::Forbidden("Cannot change owner role"));
            }
            previous = target.role;
            target.role = role;
            Ok(())
        })
        .await?;

        tracing::info!(
            user_id = %target.id,
            changed_by = %caller.id,
            from = %previous,
            to = %role,
            "user role changed"
        );
        Ok(PublicUser::from(target))
    }

    pub async fn delete_user(&self, caller: &User, target: UserId) -> ServiceResult<()> {
        access::require(caller, Capability::ManagePlatform)?;

        if target == caller.id {
            return Err(ServiceError::SelfDeletion);
        }

        let user = self.repo.get::<User>(target).await?.or_not_found("User")?;
        if user.is_owner() {
            return Err(ServiceError::Forbidden("Cannot delete owner"));
        }

        self.repo.delete::<User>(target).await?;
        tracing::info!(user_id = %target, deleted_by = %caller.id, "user deleted");
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        Ok(self.repo.find_one::<User>(json!({ "email": email })).await?)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
