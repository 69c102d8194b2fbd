use bustrack_auth::{TokenError, TokenPurpose, TokenService, extract_bearer};
use bustrack_config::JwtConfig;
use bustrack_core::{ErrorCode, UserRole};

const SECRET: &str = "unit-test-secret-key-with-enough-length";

fn tokens() -> TokenService {
    TokenService::new(JwtConfig::new(SECRET))
}

#[test]
fn test_extract_bearer() {
    assert_eq!(extract_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
    assert_eq!(extract_bearer("Bearer"), None);
    assert_eq!(extract_bearer("Bearer "), None);
    assert_eq!(extract_bearer("bearer abc"), None);
    assert_eq!(extract_bearer("Token abc"), None);
    assert_eq!(extract_bearer("Bearer abc def"), None);
    assert_eq!(extract_bearer("Bearer  abc"), None);
}

#[test]
fn test_claims_carry_identity_snapshot() {
    let tokens = tokens();
    let token = tokens
        .issue_access_token("u-42", "driver7", "driver7@example.com", UserRole::Driver)
        .unwrap();

    let claims = tokens.verify_access_token(&token).unwrap();
    assert_eq!(claims.id, "u-42");
    assert_eq!(claims.username, "driver7");
    assert_eq!(claims.role, "driver");
    assert_eq!(claims.iss, "ntc-bus-tracker");
    assert_eq!(claims.aud, "ntc-bus-tracker-users");
    assert_eq!(claims.exp - claims.iat, 86_400);
}

#[test]
fn test_other_issuer_is_rejected() {
    let mut config = JwtConfig::new(SECRET);
    config.issuer = "someone-else".to_string();
    let foreign = TokenService::new(config);
    let token = foreign
        .issue_access_token("u1", "ops", "ops@example.com", UserRole::Operator)
        .unwrap();

    let err = tokens().verify_access_token(&token).unwrap_err();
    assert!(matches!(err, TokenError::Invalid));
}

#[test]
fn test_other_audience_is_rejected() {
    let mut config = JwtConfig::new(SECRET);
    config.audience = "another-app".to_string();
    let foreign = TokenService::new(config);
    let token = foreign.issue_refresh_token("u1").unwrap();

    assert!(matches!(
        tokens().verify_refresh_token(&token),
        Err(TokenError::Invalid)
    ));
}

#[test]
fn test_separate_refresh_secret() {
    let tokens = TokenService::new(
        JwtConfig::new(SECRET).with_refresh_secret("a-different-refresh-secret"),
    );
    let pair = tokens
        .issue_token_pair("u1", "rider", "rider@example.com", UserRole::Commuter)
        .unwrap();

    assert_eq!(pair.token_type, "Bearer");
    assert!(tokens.verify_refresh_token(&pair.refresh_token).is_ok());
    assert!(tokens.verify_access_token(&pair.refresh_token).is_err());
    assert!(tokens.verify_refresh_token(&pair.access_token).is_err());
}

#[test]
fn test_expiry_inspection() {
    let tokens = tokens();
    let live = tokens
        .issue_access_token("u1", "ops", "ops@example.com", UserRole::Operator)
        .unwrap();
    let dead = tokens
        .issue_access_token_with_ttl("u1", "ops", "ops@example.com", UserRole::Operator, -10)
        .unwrap();

    assert!(!tokens.is_expired(&live));
    assert!(tokens.is_expired(&dead));
    assert!(tokens.is_expired("not-a-token"));
    assert!(tokens.expiration(&live).is_some());
}

#[test]
fn test_error_codes() {
    let tokens = tokens();
    let reset = tokens
        .issue_purpose_token("u1", TokenPurpose::PasswordReset)
        .unwrap();

    let err = tokens
        .verify_purpose_token(&reset, TokenPurpose::EmailVerification)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::WrongTokenPurpose);

    let err = tokens.verify_access_token("garbage").unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidToken);
    assert_eq!(err.into_app_error().status.as_u16(), 401);
}
