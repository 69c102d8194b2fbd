//! Token service: issues and verifies HS256-signed tokens.
//!
//! Access and refresh tokens are signed with independent secrets (the
//! refresh secret falls back to the access secret in [`JwtConfig`]).
//! Purpose-scoped tokens reuse the access secret and carry a `type` claim.
//!
//! ```ignore
//! let tokens = TokenService::new(JwtConfig::from_env());
//! let pair = tokens.issue_token_pair(&user_id, "ops", "ops@example.com", UserRole::Operator)?;
//! let claims = tokens.verify_access_token(&pair.access_token)?;
//! ```

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use bustrack_config::JwtConfig;
use bustrack_core::errors::{AppError, ErrorCode};
use bustrack_core::roles::UserRole;

use crate::claims::{AccessClaims, PurposeClaims, RefreshClaims, TokenPurpose};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token generation failed: {0}")]
    Generation(String),
    #[error("Invalid token")]
    Invalid,
    #[error("Token expired")]
    Expired,
    #[error("Invalid token type: expected {expected}")]
    WrongPurpose {
        expected: TokenPurpose,
        found: Option<String>,
    },
    #[error("Token verification is not configured")]
    Misconfigured,
}

impl TokenError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TokenError::Generation(_) | TokenError::Misconfigured => ErrorCode::Internal,
            TokenError::Invalid => ErrorCode::InvalidToken,
            TokenError::Expired => ErrorCode::ExpiredToken,
            TokenError::WrongPurpose { .. } => ErrorCode::WrongTokenPurpose,
        }
    }

    /// Maps onto the HTTP error taxonomy, keeping the kinds distinct.
    pub fn into_app_error(self) -> AppError {
        let code = self.code();
        AppError::new(code, self)
    }
}

/// Which secret a token is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "Bearer")]
    pub token_type: &'static str,
    /// Access-token lifetime in seconds
    pub expires_in: i64,
}

/// Unverified view of a token, for inspection only.
#[derive(Debug, Clone, Serialize)]
pub struct TokenInfo {
    pub header: serde_json::Value,
    pub payload: serde_json::Value,
    pub expires_at: Option<DateTime<Utc>>,
    pub issued_at: Option<DateTime<Utc>>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

/// Extracts the token from an `Authorization` header value.
///
/// The value must be exactly `Bearer <token>`: two parts separated by a
/// single space, the first being `Bearer`.
pub fn extract_bearer(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');
    let (scheme, token) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || scheme != "Bearer" || token.is_empty() {
        return None;
    }
    Some(token)
}

pub struct TokenService {
    config: JwtConfig,
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(config: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            validation,
            config,
        }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    fn secret_configured(&self, kind: TokenKind) -> bool {
        match kind {
            TokenKind::Access => !self.config.access_secret.is_empty(),
            TokenKind::Refresh => !self.config.refresh_secret.is_empty(),
        }
    }

    fn sign<T: Serialize>(&self, claims: &T, kind: TokenKind) -> Result<String, TokenError> {
        if !self.secret_configured(kind) {
            return Err(TokenError::Generation(
                "signing secret is not configured".to_string(),
            ));
        }
        let key = match kind {
            TokenKind::Access => &self.access_encoding,
            TokenKind::Refresh => &self.refresh_encoding,
        };
        encode(&Header::new(Algorithm::HS256), claims, key)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    fn verify_as<T: DeserializeOwned>(&self, token: &str, kind: TokenKind) -> Result<T, TokenError> {
        if !self.secret_configured(kind) {
            return Err(TokenError::Misconfigured);
        }
        let key = match kind {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };
        decode::<T>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(kind = ?kind, reason = ?e.kind(), "Token verification failed");
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Invalid,
                }
            })
    }

    /// Issues an access token with the configured lifetime.
    pub fn issue_access_token(
        &self,
        id: &str,
        username: &str,
        email: &str,
        role: UserRole,
    ) -> Result<String, TokenError> {
        self.issue_access_token_with_ttl(id, username, email, role, self.config.access_token_expiry)
    }

    /// Issues an access token valid for `ttl_secs` seconds from now.
    pub fn issue_access_token_with_ttl(
        &self,
        id: &str,
        username: &str,
        email: &str,
        role: UserRole,
        ttl_secs: i64,
    ) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            id: id.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            role: role.as_str().to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now,
            exp: expires_at(now, ttl_secs)?,
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims, TokenKind::Access)
    }

    pub fn issue_refresh_token(&self, id: &str) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            id: id.to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now,
            exp: expires_at(now, self.config.refresh_token_expiry)?,
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims, TokenKind::Refresh)
    }

    pub fn issue_token_pair(
        &self,
        id: &str,
        username: &str,
        email: &str,
        role: UserRole,
    ) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(id, username, email, role)?,
            refresh_token: self.issue_refresh_token(id)?,
            token_type: "Bearer",
            expires_in: self.config.access_token_expiry,
        })
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify_as(token, TokenKind::Access)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.verify_as(token, TokenKind::Refresh)
    }

    /// Issues a password-reset (1h) or email-verification (24h) token.
    pub fn issue_purpose_token(&self, id: &str, purpose: TokenPurpose) -> Result<String, TokenError> {
        let ttl = match purpose {
            TokenPurpose::PasswordReset => self.config.password_reset_expiry,
            TokenPurpose::EmailVerification => self.config.email_verification_expiry,
        };
        let now = Utc::now().timestamp();
        let claims = PurposeClaims {
            id: id.to_string(),
            token_type: Some(purpose.as_str().to_string()),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now,
            exp: expires_at(now, ttl)?,
        };
        self.sign(&claims, TokenKind::Access)
    }

    /// Verifies signature and expiry, then requires `type` to equal `purpose`.
    pub fn verify_purpose_token(
        &self,
        token: &str,
        purpose: TokenPurpose,
    ) -> Result<PurposeClaims, TokenError> {
        let claims: PurposeClaims = self.verify_as(token, TokenKind::Access)?;
        if claims.token_type.as_deref() != Some(purpose.as_str()) {
            return Err(TokenError::WrongPurpose {
                expected: purpose,
                found: claims.token_type,
            });
        }
        Ok(claims)
    }

    /// Parses a token without checking its signature or expiry.
    ///
    /// Never use the result for trust decisions.
    pub fn decode_unverified(&self, token: &str) -> Option<TokenInfo> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data =
            decode::<serde_json::Value>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
        let payload = data.claims;
        let timestamp = |key: &str| {
            payload
                .get(key)
                .and_then(serde_json::Value::as_i64)
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        };
        let text = |key: &str| payload.get(key).and_then(|v| v.as_str()).map(str::to_string);

        Some(TokenInfo {
            header: serde_json::to_value(&data.header).unwrap_or_default(),
            expires_at: timestamp("exp"),
            issued_at: timestamp("iat"),
            issuer: text("iss"),
            audience: text("aud"),
            payload,
        })
    }

    pub fn expiration(&self, token: &str) -> Option<DateTime<Utc>> {
        self.decode_unverified(token)?.expires_at
    }

    /// Undecodable tokens and tokens without `exp` count as expired.
    pub fn is_expired(&self, token: &str) -> bool {
        match self.expiration(token) {
            Some(exp) => exp < Utc::now(),
            None => true,
        }
    }
}

fn expires_at(now: i64, ttl_secs: i64) -> Result<i64, TokenError> {
    now.checked_add(ttl_secs)
        .ok_or_else(|| TokenError::Generation(format!("token lifetime of {ttl_secs}s overflows")))
}
