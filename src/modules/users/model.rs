//! User entities and request documents.
//!
//! [`User`] is the sanitised projection handed to middleware and handlers.
//! It never carries the password hash; [`UserRecord`] is the raw row and
//! [`UserCredentials`] pairs the projection with the hash for login only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use bustrack_core::{AppError, UserRole};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A `users` row as stored.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRecord> for UserCredentials {
    type Error = AppError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        let Some(role) = UserRole::parse(&record.role) else {
            error!(user.id = %record.id, role = %record.role, "Stored user has an unknown role");
            return Err(AppError::internal(anyhow::anyhow!(
                "unknown role '{}' for user {}",
                record.role,
                record.id
            )));
        };

        Ok(UserCredentials {
            user: User {
                id: record.id,
                username: record.username,
                email: record.email,
                role,
                email_verified: record.email_verified,
                created_at: record.created_at,
                updated_at: record.updated_at,
            },
            password_hash: record.password,
        })
    }
}

impl TryFrom<UserRecord> for User {
    type Error = AppError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        UserCredentials::try_from(record).map(|c| c.user)
    }
}

/// A user together with the stored password hash.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Fields for a new `users` row. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub email_verified: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct IdParams {
    pub id: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserBody {
    #[validate(length(min = 2, max = 100))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    pub params: IdParams,
    #[validate(nested)]
    pub body: UpdateUserBody,
}

impl UpdateUserRequest {
    pub fn profile_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            username: self.body.username.as_deref().map(|u| u.trim().to_string()),
            email: self
                .body
                .email
                .as_deref()
                .map(|e| e.trim().to_lowercase()),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordBody {
    /// Required unless the caller is an admin
    pub current_password: Option<String>,
    #[validate(required, length(min = 6, max = 128))]
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub params: IdParams,
    #[validate(nested)]
    pub body: ChangePasswordBody,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(role: &str) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            username: "driver1".to_string(),
            email: "driver1@example.com".to_string(),
            password: "$2b$12$hash".to_string(),
            role: role.to_string(),
            email_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_converts_legacy_role_alias() {
        let user = User::try_from(record("moderator")).unwrap();
        assert_eq!(user.role, UserRole::Operator);
    }

    #[test]
    fn test_record_with_unknown_role_is_rejected() {
        let err = User::try_from(record("superuser")).unwrap_err();
        assert!(err.is_server_error());
    }

    #[test]
    fn test_user_serialization_has_no_password() {
        let user = User::try_from(record("driver")).unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "driver");
    }

    #[test]
    fn test_profile_update_normalises_email() {
        let request: UpdateUserRequest = serde_json::from_value(serde_json::json!({
            "params": {"id": "x"},
            "body": {"email": "  Rider@Example.COM "}
        }))
        .unwrap();
        let update = request.profile_update();
        assert_eq!(update.email.as_deref(), Some("rider@example.com"));
        assert!(update.username.is_none());
    }
}
