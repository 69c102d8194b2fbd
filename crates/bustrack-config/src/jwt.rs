//! Token signing configuration.
//!
//! # Environment Variables
//!
//! - `JWT_SECRET`: access-token secret (required; an empty secret makes
//!   issuance fail)
//! - `JWT_REFRESH_SECRET`: refresh-token secret, falls back to `JWT_SECRET`
//! - `JWT_EXPIRES_IN`: access-token lifetime (default `24h`)
//! - `JWT_REFRESH_EXPIRES_IN`: refresh-token lifetime (default `7d`)
//!
//! Lifetimes accept `<n>s`, `<n>m`, `<n>h`, `<n>d` or a bare number of seconds.

use std::env;

pub const DEFAULT_ISSUER: &str = "ntc-bus-tracker";
pub const DEFAULT_AUDIENCE: &str = "ntc-bus-tracker-users";

const DEFAULT_ACCESS_TTL: i64 = 24 * 60 * 60;
const DEFAULT_REFRESH_TTL: i64 = 7 * 24 * 60 * 60;
const PASSWORD_RESET_TTL: i64 = 60 * 60;
const EMAIL_VERIFICATION_TTL: i64 = 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    /// Access-token lifetime in seconds.
    pub access_token_expiry: i64,
    /// Refresh-token lifetime in seconds.
    pub refresh_token_expiry: i64,
    pub password_reset_expiry: i64,
    pub email_verification_expiry: i64,
    pub issuer: String,
    pub audience: String,
}

impl JwtConfig {
    /// Config with default lifetimes, using `secret` for both token kinds.
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        Self {
            refresh_secret: secret.clone(),
            access_secret: secret,
            access_token_expiry: DEFAULT_ACCESS_TTL,
            refresh_token_expiry: DEFAULT_REFRESH_TTL,
            password_reset_expiry: PASSWORD_RESET_TTL,
            email_verification_expiry: EMAIL_VERIFICATION_TTL,
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
        }
    }

    pub fn from_env() -> Self {
        let access_secret = env::var("JWT_SECRET").unwrap_or_default();
        let refresh_secret = env::var("JWT_REFRESH_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| access_secret.clone());

        Self {
            access_secret,
            refresh_secret,
            access_token_expiry: env::var("JWT_EXPIRES_IN")
                .ok()
                .and_then(|s| parse_duration_secs(&s))
                .unwrap_or(DEFAULT_ACCESS_TTL),
            refresh_token_expiry: env::var("JWT_REFRESH_EXPIRES_IN")
                .ok()
                .and_then(|s| parse_duration_secs(&s))
                .unwrap_or(DEFAULT_REFRESH_TTL),
            ..Self::new(String::new())
        }
    }

    pub fn with_refresh_secret(mut self, secret: impl Into<String>) -> Self {
        self.refresh_secret = secret.into();
        self
    }

    pub fn has_secret(&self) -> bool {
        !self.access_secret.is_empty()
    }
}

/// Longest accepted token lifetime, ten years.
pub const MAX_LIFETIME_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Parses a lifetime such as `"15m"`, `"24h"`, `"7d"` or `"3600"` into seconds.
/// Lifetimes above [`MAX_LIFETIME_SECS`] are rejected.
pub fn parse_duration_secs(input: &str) -> Option<i64> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let (digits, multiplier) = match input.chars().last()? {
        's' => (&input[..input.len() - 1], 1),
        'm' => (&input[..input.len() - 1], 60),
        'h' => (&input[..input.len() - 1], 60 * 60),
        'd' => (&input[..input.len() - 1], 24 * 60 * 60),
        c if c.is_ascii_digit() => (input, 1),
        _ => return None,
    };

    let value: i64 = digits.trim().parse().ok()?;
    if value <= 0 {
        return None;
    }
    value
        .checked_mul(multiplier)
        .filter(|secs| *secs <= MAX_LIFETIME_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration_secs("30s"), Some(30));
        assert_eq!(parse_duration_secs("15m"), Some(900));
        assert_eq!(parse_duration_secs("24h"), Some(86_400));
        assert_eq!(parse_duration_secs("7d"), Some(604_800));
        assert_eq!(parse_duration_secs("3600"), Some(3600));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert_eq!(parse_duration_secs(""), None);
        assert_eq!(parse_duration_secs("h"), None);
        assert_eq!(parse_duration_secs("10w"), None);
        assert_eq!(parse_duration_secs("-5m"), None);
        assert_eq!(parse_duration_secs("0"), None);
    }

    #[test]
    fn test_parse_duration_rejects_huge_lifetimes() {
        assert_eq!(parse_duration_secs("9000000000000000000"), None);
        assert_eq!(parse_duration_secs("9000000000000000000d"), None);
        assert_eq!(parse_duration_secs("3651d"), None);
        assert_eq!(parse_duration_secs("3650d"), Some(MAX_LIFETIME_SECS));
    }

    #[test]
    fn test_new_uses_defaults() {
        let config = JwtConfig::new("secret");
        assert_eq!(config.access_token_expiry, 86_400);
        assert_eq!(config.refresh_token_expiry, 604_800);
        assert_eq!(config.password_reset_expiry, 3600);
        assert_eq!(config.refresh_secret, "secret");
        assert_eq!(config.issuer, "ntc-bus-tracker");
        assert_eq!(config.audience, "ntc-bus-tracker-users");
        assert!(config.has_secret());
        assert!(!JwtConfig::new("").has_secret());
    }
}
