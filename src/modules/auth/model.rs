use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use bustrack_auth::TokenPair;
use bustrack_core::UserRole;

use crate::modules::users::model::User;

/// Roles a caller may pick at public registration. Admins come from the
/// CLI, drivers from an admin.
fn registrable_role(role: &str) -> Result<(), ValidationError> {
    match UserRole::parse(role) {
        Some(UserRole::Commuter | UserRole::Operator) => Ok(()),
        _ => Err(ValidationError::new("role")
            .with_message("must be one of [operator, commuter]".into())),
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterBody {
    #[validate(required, length(min = 2, max = 100))]
    #[schema(example = "amara")]
    pub username: Option<String>,
    #[validate(required, email)]
    #[schema(example = "amara@example.com")]
    pub email: Option<String>,
    #[validate(required, length(min = 6, max = 128))]
    pub password: Option<String>,
    /// Defaults to `commuter`
    #[validate(custom(function = "registrable_role"))]
    #[schema(example = "commuter")]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(nested)]
    pub body: RegisterBody,
}

impl RegisterRequest {
    pub fn username(&self) -> &str {
        self.body.username.as_deref().unwrap_or_default().trim()
    }

    pub fn email(&self) -> String {
        self.body
            .email
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase()
    }

    pub fn password(&self) -> &str {
        self.body.password.as_deref().unwrap_or_default()
    }

    pub fn role(&self) -> UserRole {
        self.body
            .role
            .as_deref()
            .and_then(UserRole::parse)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginBody {
    #[validate(required, email)]
    #[schema(example = "amara@example.com")]
    pub email: Option<String>,
    #[validate(required, length(min = 6, max = 128))]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(nested)]
    pub body: LoginBody,
}

impl LoginRequest {
    pub fn email(&self) -> String {
        self.body
            .email
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase()
    }

    pub fn password(&self) -> &str {
        self.body.password.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshBody {
    #[validate(required, length(min = 1))]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(nested)]
    pub body: RefreshBody,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LogoutBody {
    /// Revoked alongside the access token when supplied
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LogoutRequest {
    #[validate(nested)]
    pub body: LogoutBody,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordBody {
    #[validate(required, email)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(nested)]
    pub body: ForgotPasswordBody,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordBody {
    #[validate(required, length(min = 1))]
    pub token: Option<String>,
    #[validate(required, length(min = 6, max = 128))]
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(nested)]
    pub body: ResetPasswordBody,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyEmailBody {
    #[validate(required, length(min = 1))]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    #[validate(nested)]
    pub body: VerifyEmailBody,
}

/// A signed-in user and their token pair.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthSession {
    pub user: User,
    pub tokens: TokenPair,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn register(body: serde_json::Value) -> RegisterRequest {
        serde_json::from_value(json!({ "body": body })).unwrap()
    }

    #[test]
    fn test_register_rejects_admin_role() {
        let request = register(json!({
            "username": "eve",
            "email": "eve@example.com",
            "password": "secret1",
            "role": "admin"
        }));
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_register_rejects_driver_role() {
        let request = register(json!({
            "username": "dan",
            "email": "dan@example.com",
            "password": "secret1",
            "role": "driver"
        }));
        let errors = request.validate().unwrap_err();
        let details = crate::validator::flatten_errors(&errors);
        assert_eq!(details[0].path, vec!["body", "role"]);
    }

    #[test]
    fn test_register_accepts_legacy_role_names() {
        let request = register(json!({
            "username": "mo",
            "email": "mo@example.com",
            "password": "secret1",
            "role": "moderator"
        }));
        assert!(request.validate().is_ok());
        assert_eq!(request.role(), UserRole::Operator);
    }

    #[test]
    fn test_register_normalises_input() {
        let request = register(json!({
            "username": "  amara ",
            "email": "Amara@Example.com",
            "password": "secret1"
        }));
        assert!(request.validate().is_ok());
        assert_eq!(request.username(), "amara");
        assert_eq!(request.email(), "amara@example.com");
        assert_eq!(request.role(), UserRole::Commuter);
    }

    #[test]
    fn test_login_requires_both_fields() {
        let request: LoginRequest = serde_json::from_value(json!({ "body": {} })).unwrap();
        let errors = request.validate().unwrap_err();
        let details = crate::validator::flatten_errors(&errors);
        assert_eq!(details.len(), 2);
    }
}
