//! Ownership and self-access rules.
//!
//! Ids are compared in canonical textual form (see
//! [`canonical_id`](crate::store::canonical_id)), so `"6F1C…"` and
//! `"6f1c…"` name the same user.

use axum::{
    body::{Body, to_bytes},
    extract::Request,
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tracing::warn;

use bustrack_core::{AppError, ErrorCode, UserRole};

use crate::metrics::track_authorization_check;
use crate::middleware::role::{identity, param, path_params};
use crate::store::canonical_id;

const MAX_BODY_BYTES: usize = 1024 * 1024;

fn same_id(a: &str, b: &str) -> bool {
    canonical_id(a) == canonical_id(b)
}

fn body_field(bytes: &[u8], field: &str) -> Option<String> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    match value.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Admins pass. Anyone else must be the owner named by `field`, taken
/// from the path parameters or, failing that, the JSON body. The body is
/// buffered and handed on to the handler unchanged.
pub async fn require_ownership_or_admin(
    req: Request,
    next: Next,
    field: &'static str,
) -> Result<Response, AppError> {
    let user = identity(&req)?;
    if user.role == UserRole::Admin {
        track_authorization_check("ownership", true);
        return Ok(next.run(req).await);
    }

    let (mut parts, body) = req.into_parts();
    let params = path_params(&mut parts).await;

    let (owner, body) = match param(&params, field) {
        Some(owner) => (Some(owner.to_string()), body),
        None => {
            let bytes = to_bytes(body, MAX_BODY_BYTES).await.map_err(|e| {
                AppError::with_message(ErrorCode::BadRequest, format!("Unreadable body: {e}"))
            })?;
            (body_field(&bytes, field), Body::from(bytes))
        }
    };

    if !owner.is_some_and(|owner| same_id(&owner, &user.id)) {
        warn!(user.id = %user.id, field, "Ownership check denied");
        track_authorization_check("ownership", false);
        return Err(AppError::with_message(
            ErrorCode::AccessDenied,
            "Access denied - insufficient permissions",
        ));
    }

    track_authorization_check("ownership", true);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Admins pass. Anyone else must be the user named by the `userId`,
/// `user_id` or `id` path parameter.
pub async fn require_self_or_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let user = identity(&req)?;
    if user.role == UserRole::Admin {
        track_authorization_check("self", true);
        return Ok(next.run(req).await);
    }

    let (mut parts, body) = req.into_parts();
    let params = path_params(&mut parts).await;
    let target = param(&params, "userId")
        .or_else(|| param(&params, "user_id"))
        .or_else(|| param(&params, "id"));

    if !target.is_some_and(|target| same_id(target, &user.id)) {
        warn!(user.id = %user.id, "Self-access check denied");
        track_authorization_check("self", false);
        return Err(AppError::with_message(
            ErrorCode::AccessDenied,
            "Access denied - can only modify own data",
        ));
    }

    track_authorization_check("self", true);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_field_accepts_strings_and_numbers() {
        assert_eq!(body_field(br#"{"user_id":"u1"}"#, "user_id").as_deref(), Some("u1"));
        assert_eq!(body_field(br#"{"user_id":42}"#, "user_id").as_deref(), Some("42"));
        assert_eq!(body_field(br#"{"user_id":""}"#, "user_id"), None);
        assert_eq!(body_field(br#"{"other":"u1"}"#, "user_id"), None);
        assert_eq!(body_field(b"not json", "user_id"), None);
    }

    #[test]
    fn test_same_id_compares_canonical_form() {
        let id = uuid::Uuid::new_v4();
        assert!(same_id(&id.to_string().to_uppercase(), &id.to_string()));
        assert!(!same_id("u1", "u2"));
    }
}
