//! Request authentication.
//!
//! [`require_auth`] resolves the bearer token to a user and publishes an
//! [`AuthUser`] into the request extensions, failing the request on any
//! problem. [`optional_auth`] does the same but lets the request through
//! anonymously instead of failing.
//!
//! Order of checks: header, revocation list, signature and expiry, user
//! lookup.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

use bustrack_auth::extract_bearer;
use bustrack_core::{AppError, ErrorCode, UserRole};

use crate::metrics::track_authentication;
use crate::modules::users::model::User;
use crate::state::AppState;

/// The resolved identity of the caller. Never carries a password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn has_role(&self, roles: &[UserRole]) -> bool {
        roles.contains(&self.role)
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

/// The raw bearer token of an authenticated request, for logout.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(AppError::authentication_required)
    }
}

/// Identity when present; never rejects.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeAuthUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(parts.extensions.get::<AuthUser>().cloned()))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<BearerToken>()
            .cloned()
            .ok_or_else(AppError::authentication_required)
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer)
        .map(str::to_string)
}

/// Resolves the request's bearer token to a user.
pub async fn authenticate(state: &AppState, parts: &Parts) -> Result<(AuthUser, String), AppError> {
    let Some(token) = bearer_token(parts) else {
        return Err(AppError::with_message(
            ErrorCode::MissingToken,
            "Access token required",
        ));
    };

    if state.revocations.is_revoked(&token).await? {
        warn!("Revoked token presented");
        return Err(AppError::with_message(
            ErrorCode::RevokedToken,
            "Token has been revoked",
        ));
    }

    let claims = state
        .tokens
        .verify_access_token(&token)
        .map_err(|e| e.into_app_error())?;

    let Some(user) = state.users.find_user_by_id(&claims.id).await? else {
        warn!(user.id = %claims.id, "Token subject no longer exists");
        return Err(AppError::with_message(
            ErrorCode::UserNotFound,
            "Invalid token - user not found",
        ));
    };

    Ok((AuthUser::from(user), token))
}

pub async fn require_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    match authenticate(&state, &parts).await {
        Ok((user, token)) => {
            debug!(user.id = %user.id, user.role = %user.role, "Request authenticated");
            track_authentication("success");
            parts.extensions.insert(user);
            parts.extensions.insert(BearerToken(token));
        }
        Err(err) => {
            if !err.is_server_error() {
                warn!(error.code = %err.code, "Authentication failed");
            }
            track_authentication(err.code.as_str());
            return Err(err);
        }
    }

    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Publishes an identity when the request carries a usable token; any
/// failure, store errors included, leaves the request anonymous.
pub async fn optional_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();

    if parts.headers.contains_key(header::AUTHORIZATION) {
        match authenticate(&state, &parts).await {
            Ok((user, token)) => {
                parts.extensions.insert(user);
                parts.extensions.insert(BearerToken(token));
            }
            Err(err) if err.is_server_error() => {
                warn!(error = %err.error, "Optional authentication failed, continuing anonymously");
            }
            Err(err) => {
                debug!(error.code = %err.code, "Ignoring unusable token");
            }
        }
    }

    next.run(Request::from_parts(parts, body)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    fn parts_with(header_value: Option<&str>) -> Parts {
        let mut builder = HttpRequest::builder().uri("/");
        if let Some(value) = header_value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_requires_exact_scheme() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc"))).as_deref(), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("Token abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer a b"))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[tokio::test]
    async fn test_auth_user_extractor_requires_identity() {
        let mut parts = parts_with(None);
        let err = AuthUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthenticationRequired);

        let MaybeAuthUser(user) = MaybeAuthUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_auth_user_extractor_reads_extension() {
        let mut parts = parts_with(None);
        let user = AuthUser {
            id: "u1".to_string(),
            username: "ops".to_string(),
            email: "ops@example.com".to_string(),
            role: UserRole::Operator,
        };
        parts.extensions.insert(user.clone());

        let extracted = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(extracted, user);
        assert!(!extracted.is_admin());
        assert!(extracted.has_role(&[UserRole::Admin, UserRole::Operator]));
    }
}
