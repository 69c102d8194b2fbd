//! In-memory store for tests. Same contract and expiry filtering as
//! [`super::PgStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use bustrack_core::{AppError, ErrorCode};

use super::{RevocationStore, UserStore};
use crate::modules::users::model::{NewUser, ProfileUpdate, User, UserCredentials};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, UserCredentials>>,
    revoked: RwLock<Vec<(String, DateTime<Utc>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deletes a user outright, leaving any tokens issued to them outstanding.
    pub async fn remove_user(&self, id: Uuid) -> bool {
        self.users.write().await.remove(&id).is_some()
    }

    pub async fn revoked_entries(&self) -> usize {
        self.revoked.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let Ok(id) = Uuid::parse_str(id.trim()) else {
            return Ok(None);
        };
        Ok(self.users.read().await.get(&id).map(|c| c.user.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserCredentials>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|c| c.user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|c| c.user.username == username)
            .map(|c| c.user.clone()))
    }

    async fn email_or_username_taken(
        &self,
        email: &str,
        username: &str,
    ) -> Result<bool, AppError> {
        Ok(self.users.read().await.values().any(|c| {
            c.user.email.eq_ignore_ascii_case(email) || c.user.username == username
        }))
    }

    async fn insert_user(&self, new: NewUser) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users.values().any(|c| {
            c.user.email.eq_ignore_ascii_case(&new.email) || c.user.username == new.username
        }) {
            return Err(AppError::with_message(
                ErrorCode::Conflict,
                "Resource already exists",
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            role: new.role,
            email_verified: new.email_verified,
            created_at: now,
            updated_at: now,
        };
        users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(user)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError> {
        let mut users = self.users.write().await;
        let Some(entry) = users.get_mut(&id) else {
            return Ok(false);
        };
        entry.password_hash = password_hash.to_string();
        entry.user.updated_at = Utc::now();
        Ok(true)
    }

    async fn mark_email_verified(&self, id: Uuid) -> Result<bool, AppError> {
        let mut users = self.users.write().await;
        let Some(entry) = users.get_mut(&id) else {
            return Ok(false);
        };
        entry.user.email_verified = true;
        entry.user.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        let clash = users.values().any(|c| {
            c.user.id != id
                && (update.username.as_deref() == Some(c.user.username.as_str())
                    || update
                        .email
                        .as_deref()
                        .is_some_and(|e| c.user.email.eq_ignore_ascii_case(e)))
        });
        if clash {
            return Err(AppError::with_message(
                ErrorCode::Conflict,
                "Resource already exists",
            ));
        }

        let Some(entry) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = update.username {
            entry.user.username = username;
        }
        if let Some(email) = update.email {
            entry.user.email = email;
        }
        entry.user.updated_at = Utc::now();
        Ok(Some(entry.user.clone()))
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), AppError> {
        let users = self.users.read().await;
        let mut all: Vec<User> = users.values().map(|c| c.user.clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = all.len() as i64;
        let page = all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_credentials_by_id(&self, id: Uuid) -> Result<Option<UserCredentials>, AppError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl RevocationStore for MemoryStore {
    async fn insert_revoked_token(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.revoked
            .write()
            .await
            .push((token.to_string(), expires_at));
        Ok(())
    }

    async fn count_non_expired_revocations(&self, token: &str) -> Result<i64, AppError> {
        let now = Utc::now();
        let count = self
            .revoked
            .read()
            .await
            .iter()
            .filter(|(t, expires_at)| t == token && *expires_at > now)
            .count();
        Ok(count as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bustrack_core::UserRole;
    use chrono::Duration;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: UserRole::Commuter,
            email_verified: false,
        }
    }

    #[tokio::test]
    async fn test_lookup_by_id_text() {
        let store = MemoryStore::new();
        let user = store
            .insert_user(new_user("rider", "rider@example.com"))
            .await
            .unwrap();

        let upper = user.id.to_string().to_uppercase();
        assert!(store.find_user_by_id(&upper).await.unwrap().is_some());
        assert!(store.find_user_by_id("not-a-uuid").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let store = MemoryStore::new();
        store
            .insert_user(new_user("rider", "rider@example.com"))
            .await
            .unwrap();

        let err = store
            .insert_user(new_user("other", "RIDER@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert!(
            store
                .email_or_username_taken("x@example.com", "rider")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_expired_revocations_are_not_counted() {
        let store = MemoryStore::new();
        store
            .insert_revoked_token("live", Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        store
            .insert_revoked_token("stale", Utc::now() - Duration::seconds(1))
            .await
            .unwrap();

        assert_eq!(store.count_non_expired_revocations("live").await.unwrap(), 1);
        assert_eq!(store.count_non_expired_revocations("stale").await.unwrap(), 0);
        assert_eq!(store.revoked_entries().await, 2);
    }

    #[tokio::test]
    async fn test_list_users_paginates() {
        let store = MemoryStore::new();
        for i in 0..3 {
            store
                .insert_user(new_user(&format!("u{i}"), &format!("u{i}@example.com")))
                .await
                .unwrap();
        }
        let (page, total) = store.list_users(2, 2).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
    }
}
