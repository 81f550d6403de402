use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// User role for authorization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "user_role", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Moderator,
    Admin,
}

impl UserRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Moderators and admins can remove or hide other users' content.
    pub fn can_moderate(&self) -> bool {
        matches!(self, UserRole::Moderator | UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Moderator => write!(f, "moderator"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub is_suspended: bool,
    pub suspended_until: Option<DateTime<Utc>>,
    pub nuts_balance: i64,
    pub images_generated: i32,
    pub videos_generated: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A suspension without an end date lasts until lifted.
    pub fn is_suspended_at(&self, now: DateTime<Utc>) -> bool {
        self.is_suspended && self.suspended_until.map_or(true, |until| until > now)
    }
}

/// Public profile shown next to gallery items
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        PublicUser {
            id: user.id,
            username: user.username.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Creates the profile row for the authenticated subject
#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateProfileRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 3, max = 32, message = "username must be between 3 and 32 characters"))]
    pub username: String,
}

/// Query parameters for the admin user list
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminUserQuery {
    /// Case-insensitive match on username or email
    pub search: Option<String>,
    #[serde(default)]
    pub banned_only: bool,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct BanUserRequest {
    #[serde(default)]
    #[validate(length(max = 500, message = "reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SuspendUserRequest {
    /// End of the suspension; omitted means until lifted
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    #[serde(default)]
    #[validate(length(max = 500, message = "reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GrantNutsRequest {
    #[validate(range(min = 1, max = 1_000_000, message = "amount must be between 1 and 1000000"))]
    pub amount: i64,
    #[serde(default)]
    #[validate(length(max = 255, message = "note must be at most 255 characters"))]
    pub note: Option<String>,
}
