//! Authorization layers.
//!
//! Each layer assumes [`require_auth`](super::auth::require_auth) ran
//! first and re-checks that an identity is present (401 otherwise). They
//! are composed per route:
//!
//! ```rust,ignore
//! use axum::middleware::{from_fn, from_fn_with_state};
//!
//! Router::new()
//!     .route("/", post(create_bus))
//!     .route_layer(from_fn(|req: Request, next: Next| {
//!         require_roles(req, next, &[UserRole::Admin, UserRole::Operator])
//!     }))
//!     .route_layer(from_fn_with_state(state.clone(), require_auth));
//! ```
//!
//! `route_layer` wraps what was added before it, so the authentication
//! layer goes last.

use axum::{
    extract::{FromRequestParts, RawPathParams, Request, State},
    http::{Method, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use bustrack_core::{AppError, ErrorCode, UserRole};

use crate::metrics::track_authorization_check;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// The caller's identity, or 401 when authentication has not run.
pub(crate) fn identity(req: &Request) -> Result<AuthUser, AppError> {
    req.extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(AppError::authentication_required)
}

/// Path parameters of the matched route, in declaration order.
pub(crate) async fn path_params(parts: &mut Parts) -> Vec<(String, String)> {
    match RawPathParams::from_request_parts(parts, &()).await {
        Ok(params) => params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        Err(_) => Vec::new(),
    }
}

pub(crate) fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

pub fn check_role(user: &AuthUser, role: UserRole) -> bool {
    user.role == role
}

pub fn check_any_role(user: &AuthUser, roles: &[UserRole]) -> bool {
    roles.contains(&user.role)
}

fn deny(check: &str, user: &AuthUser, code: ErrorCode, message: impl Into<String>) -> AppError {
    let message = message.into();
    warn!(
        user.id = %user.id,
        user.role = %user.role,
        check,
        reason = %message,
        "Authorization denied"
    );
    track_authorization_check(check, false);
    AppError::with_message(code, message)
}

pub async fn require_roles(
    req: Request,
    next: Next,
    allowed: &'static [UserRole],
) -> Result<Response, AppError> {
    let user = identity(&req)?;
    if !check_any_role(&user, allowed) {
        return Err(deny(
            "role",
            &user,
            ErrorCode::InsufficientRole,
            "Insufficient permissions",
        ));
    }
    track_authorization_check("role", true);
    Ok(next.run(req).await)
}

pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let user = identity(&req)?;
    if !check_role(&user, UserRole::Admin) {
        return Err(deny(
            "admin",
            &user,
            ErrorCode::InsufficientRole,
            "Admin access required",
        ));
    }
    track_authorization_check("admin", true);
    Ok(next.run(req).await)
}

/// Requires the caller's role to grant `permission` in the permission
/// matrix held by the application state.
pub async fn require_permission(
    State(state): State<AppState>,
    req: Request,
    next: Next,
    permission: &'static str,
) -> Result<Response, AppError> {
    let user = identity(&req)?;
    if !state.permissions.role_has(user.role, permission) {
        return Err(deny(
            "permission",
            &user,
            ErrorCode::MissingPermission,
            format!("Permission '{permission}' required"),
        ));
    }
    track_authorization_check("permission", true);
    Ok(next.run(req).await)
}

/// Admins pass. Drivers pass for any bus named in the path; vehicle
/// assignment is not checked. Everyone else is denied.
pub async fn require_bus_access(req: Request, next: Next) -> Result<Response, AppError> {
    let user = identity(&req)?;

    match user.role {
        UserRole::Admin => {}
        UserRole::Driver => {
            let (mut parts, body) = req.into_parts();
            let params = path_params(&mut parts).await;
            let bus_id = param(&params, "busId")
                .or_else(|| param(&params, "bus_id"))
                .or_else(|| param(&params, "id"));
            if bus_id.is_none() {
                return Err(AppError::with_message(
                    ErrorCode::BadRequest,
                    "Bus ID required",
                ));
            }
            track_authorization_check("bus_access", true);
            return Ok(next.run(Request::from_parts(parts, body)).await);
        }
        _ => {
            return Err(deny(
                "bus_access",
                &user,
                ErrorCode::AccessDenied,
                "Access denied - insufficient permissions for bus data",
            ));
        }
    }

    track_authorization_check("bus_access", true);
    Ok(next.run(req).await)
}

/// Admins and operators pass; everyone else may only read.
pub async fn require_trip_access(req: Request, next: Next) -> Result<Response, AppError> {
    let user = identity(&req)?;
    if !check_any_role(&user, &[UserRole::Admin, UserRole::Operator])
        && req.method() != Method::GET
    {
        return Err(deny(
            "trip_access",
            &user,
            ErrorCode::AccessDenied,
            "Access denied - insufficient permissions for trip modification",
        ));
    }
    track_authorization_check("trip_access", true);
    Ok(next.run(req).await)
}
