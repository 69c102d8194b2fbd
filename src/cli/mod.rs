//! Administrative commands run outside the HTTP surface.

use anyhow::{Context, bail};
use validator::ValidateEmail;

use bustrack_core::{UserRole, hash_password};

use crate::modules::users::model::{NewUser, User};
use crate::store::UserStore;

/// Inserts a pre-verified admin. Role elevation is not reachable over HTTP,
/// so this is the only way to create one.
pub async fn create_admin(
    store: &dyn UserStore,
    username: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<User> {
    let username = username.trim();
    let email = email.trim().to_lowercase();

    if username.chars().count() < 2 || username.chars().count() > 100 {
        bail!("Username must be between 2 and 100 characters");
    }
    if !email.validate_email() {
        bail!("'{email}' is not a valid email address");
    }
    if password.len() < 6 || password.len() > 128 {
        bail!("Password must be between 6 and 128 characters");
    }

    if store
        .email_or_username_taken(&email, username)
        .await
        .map_err(|e| e.error)?
    {
        bail!("User with this email or username already exists");
    }

    let password_hash = hash_password(password)
        .map_err(|e| e.error)
        .context("Failed to hash password")?;

    let user = store
        .insert_user(NewUser {
            username: username.to_string(),
            email,
            password_hash,
            role: UserRole::Admin,
            email_verified: true,
        })
        .await
        .map_err(|e| e.error)?;

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn test_create_admin() {
        let store = MemoryStore::new();
        let user = create_admin(&store, " root ", "Root@Example.com", "secret123")
            .await
            .unwrap();

        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(user.username, "root");
        assert_eq!(user.email, "root@example.com");
        assert!(user.email_verified);
    }

    #[tokio::test]
    async fn test_create_admin_rejects_duplicates() {
        let store = MemoryStore::new();
        create_admin(&store, "root", "root@example.com", "secret123")
            .await
            .unwrap();

        let err = create_admin(&store, "root2", "ROOT@example.com", "secret123")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_create_admin_validates_input() {
        let store = MemoryStore::new();
        assert!(create_admin(&store, "root", "not-an-email", "secret123").await.is_err());
        assert!(create_admin(&store, "root", "root@example.com", "123").await.is_err());
        assert!(create_admin(&store, "r", "root@example.com", "secret123").await.is_err());
    }
}
