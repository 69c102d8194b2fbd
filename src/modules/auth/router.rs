use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_governor::GovernorLayer;

use crate::middleware::auth::require_auth;
use crate::state::AppState;

use super::controller::{
    forgot_password, login, logout, profile, refresh, register, reset_password, verify_email,
};

pub fn init_auth_router(state: AppState) -> Router<AppState> {
    // Credential-guessing surface, behind the stricter limiter
    let mut limited = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password));

    if let Some(config) = state.rate_limit_config.auth_governor_config() {
        limited = limited.layer(GovernorLayer::new(Arc::new(config)));
    }

    let public = Router::new()
        .route("/refresh", post(refresh))
        .route("/reset-password", post(reset_password))
        .route("/verify-email", post(verify_email));

    let authenticated = Router::new()
        .route("/logout", post(logout))
        .route("/profile", get(profile))
        .route_layer(from_fn_with_state(state, require_auth));

    limited.merge(public).merge(authenticated)
}
