use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;

use bustrack_auth::TokenService;
use bustrack_config::{CorsConfig, EmailConfig, JwtConfig, RateLimitConfig};
use bustrack_core::PermissionMatrix;

use crate::revocation::RevocationService;
use crate::store::{PgStore, RevocationStore, UserStore};
use crate::utils::email::EmailService;

/// Shared, immutable-after-startup application state.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub tokens: Arc<TokenService>,
    pub users: Arc<dyn UserStore>,
    pub revocations: RevocationService,
    pub permissions: Arc<PermissionMatrix>,
    pub email: EmailService,
    pub cors_config: CorsConfig,
    pub rate_limit_config: RateLimitConfig,
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("tokens", &self.tokens)
            .field("cors_config", &self.cors_config)
            .field("rate_limit_config", &self.rate_limit_config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Builds state over `store`, with default email, CORS and rate-limit
    /// settings.
    pub fn new<S>(db: PgPool, store: Arc<S>, jwt_config: JwtConfig) -> Self
    where
        S: UserStore + RevocationStore + 'static,
    {
        let tokens = Arc::new(TokenService::new(jwt_config));
        let revocation_store: Arc<dyn RevocationStore> = store.clone();
        Self {
            db,
            revocations: RevocationService::new(revocation_store, tokens.clone()),
            tokens,
            users: store,
            permissions: Arc::new(PermissionMatrix::new()),
            email: EmailService::new(EmailConfig::default()),
            cors_config: CorsConfig::default(),
            rate_limit_config: RateLimitConfig::default(),
            metrics: None,
        }
    }

    pub fn with_email_config(mut self, config: EmailConfig) -> Self {
        self.email = EmailService::new(config);
        self
    }

    pub fn with_cors_config(mut self, config: CorsConfig) -> Self {
        self.cors_config = config;
        self
    }

    pub fn with_rate_limit_config(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit_config = config;
        self
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}

/// State for the server process, configured from the environment.
pub fn init_app_state(db: PgPool, metrics: Option<PrometheusHandle>) -> AppState {
    let store = Arc::new(PgStore::new(db.clone()));
    AppState::new(db, store, JwtConfig::from_env())
        .with_email_config(EmailConfig::from_env())
        .with_cors_config(CorsConfig::from_env())
        .with_rate_limit_config(RateLimitConfig::from_env())
        .with_metrics(metrics)
}
