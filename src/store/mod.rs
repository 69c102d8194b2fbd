//! Persistence seam for identity and revocation data.
//!
//! Authentication, the revocation list and the account flows only reach
//! storage through [`UserStore`] and [`RevocationStore`]. Production uses
//! [`PgStore`]; tests use the in-memory `MemoryStore`.
//!
//! Ids arrive as text from token claims and path parameters. A value that
//! is not a UUID never matches a user, so lookups return `Ok(None)` rather
//! than an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use bustrack_core::AppError;

use crate::modules::users::model::{NewUser, ProfileUpdate, User, UserCredentials};

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod postgres;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserCredentials>, AppError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn email_or_username_taken(&self, email: &str, username: &str)
    -> Result<bool, AppError>;

    async fn insert_user(&self, user: NewUser) -> Result<User, AppError>;

    /// Returns false when no such user exists.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError>;

    async fn mark_email_verified(&self, id: Uuid) -> Result<bool, AppError>;

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, AppError>;

    /// Newest first, with the total row count.
    async fn list_users(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), AppError>;

    /// Password hash lookup by id, for password changes.
    async fn find_credentials_by_id(&self, id: Uuid) -> Result<Option<UserCredentials>, AppError>;
}

#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn insert_revoked_token(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Counts entries for `token` whose `expires_at` is still in the future.
    async fn count_non_expired_revocations(&self, token: &str) -> Result<i64, AppError>;
}

/// Canonical textual form of an id: the lower-case hyphenated UUID when the
/// input parses as one, otherwise the trimmed input.
pub fn canonical_id(id: &str) -> String {
    let trimmed = id.trim();
    Uuid::parse_str(trimmed)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_id_normalises_uuid_forms() {
        let id = Uuid::new_v4();
        let upper = id.to_string().to_uppercase();
        let simple = id.simple().to_string();

        assert_eq!(canonical_id(&upper), id.to_string());
        assert_eq!(canonical_id(&simple), id.to_string());
        assert_eq!(canonical_id(&format!(" {id} ")), id.to_string());
    }

    #[test]
    fn test_canonical_id_keeps_non_uuid_text() {
        assert_eq!(canonical_id(" u1 "), "u1");
    }
}
