//! Token revocation list.
//!
//! Revoked tokens are stored with their natural expiry and are never
//! deleted. An entry only counts while `expires_at` is in the future, so
//! expired rows are inert.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use bustrack_auth::TokenService;
use bustrack_core::AppError;

use crate::metrics::track_token_revoked;
use crate::store::RevocationStore;

#[derive(Clone)]
pub struct RevocationService {
    store: Arc<dyn RevocationStore>,
    tokens: Arc<TokenService>,
}

impl RevocationService {
    pub fn new(store: Arc<dyn RevocationStore>, tokens: Arc<TokenService>) -> Self {
        Self { store, tokens }
    }

    /// Records `token` as revoked until its `exp`.
    ///
    /// A token that cannot be decoded, or has no `exp`, is logged and
    /// ignored. Store failures are returned.
    #[instrument(skip_all)]
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        let Some(expires_at) = self.tokens.expiration(token) else {
            warn!("Token could not be decoded, skipping revocation");
            return Ok(());
        };

        self.store.insert_revoked_token(token, expires_at).await?;
        track_token_revoked();
        info!(expires_at = %expires_at, "Token revoked");
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn is_revoked(&self, token: &str) -> Result<bool, AppError> {
        Ok(self.store.count_non_expired_revocations(token).await? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use bustrack_config::JwtConfig;
    use bustrack_core::UserRole;

    fn service() -> (RevocationService, Arc<TokenService>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let tokens = Arc::new(TokenService::new(JwtConfig::new("test-secret")));
        (
            RevocationService::new(store.clone(), tokens.clone()),
            tokens,
            store,
        )
    }

    #[tokio::test]
    async fn test_revoked_until_expiry() {
        let (revocations, tokens, _) = service();
        let token = tokens
            .issue_access_token("u1", "ops", "ops@example.com", UserRole::Operator)
            .unwrap();

        assert!(!revocations.is_revoked(&token).await.unwrap());
        revocations.revoke(&token).await.unwrap();
        assert!(revocations.is_revoked(&token).await.unwrap());
    }

    #[tokio::test]
    async fn test_already_expired_token_is_not_reported_revoked() {
        let (revocations, tokens, store) = service();
        let token = tokens
            .issue_access_token_with_ttl("u1", "ops", "ops@example.com", UserRole::Operator, -10)
            .unwrap();

        revocations.revoke(&token).await.unwrap();
        assert_eq!(store.revoked_entries().await, 1);
        assert!(!revocations.is_revoked(&token).await.unwrap());
    }

    #[tokio::test]
    async fn test_undecodable_token_is_a_no_op() {
        let (revocations, _, store) = service();
        revocations.revoke("not-a-token").await.unwrap();
        assert_eq!(store.revoked_entries().await, 0);
    }
}
