mod common;

use axum::http::{StatusCode, header};
use bustrack_auth::TokenPurpose;
use bustrack_core::UserRole;
use common::{TEST_PASSWORD, TestApp, error_code, request};
use serde_json::json;

#[tokio::test]
async fn test_register_login_and_profile() {
    let app = TestApp::new();

    let (status, body) = app
        .send(request(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({
                "username": "amara",
                "email": "Amara@Example.com",
                "password": "secret123"
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["user"]["role"], "commuter");
    assert_eq!(body["data"]["user"]["email"], "amara@example.com");
    assert!(body["data"]["user"].get("password").is_none());
    assert_eq!(body["data"]["tokens"]["token_type"], "Bearer");

    let (status, body) = app
        .send(request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "amara@example.com", "password": "secret123"})),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["data"]["tokens"]["access_token"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(request("GET", "/api/v1/auth/profile", Some(&access), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "amara");
}

#[tokio::test]
async fn test_register_duplicate_is_conflict() {
    let app = TestApp::new();
    app.create_user("amara", UserRole::Commuter).await;

    let (status, body) = app
        .send(request(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({
                "username": "someone",
                "email": "amara@example.com",
                "password": "secret123"
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "conflict");
}

#[tokio::test]
async fn test_register_cannot_pick_admin() {
    let app = TestApp::new();

    let (status, body) = app
        .send(request(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({
                "username": "mallory",
                "email": "mallory@example.com",
                "password": "secret123",
                "role": "admin"
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(common::detail_paths(&body), vec!["body.role"]);
}

#[tokio::test]
async fn test_register_cannot_pick_driver() {
    let app = TestApp::new();

    let (status, body) = app
        .send(request(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({
                "username": "dan",
                "email": "dan@example.com",
                "password": "secret123",
                "role": "driver"
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(common::detail_paths(&body), vec!["body.role"]);
    assert_eq!(
        body["details"][0]["message"],
        "\"role\" must be one of [operator, commuter]"
    );
}

#[tokio::test]
async fn test_login_wrong_password_is_generic() {
    let app = TestApp::new();
    app.create_user("amara", UserRole::Commuter).await;

    let (status, wrong_password) = app
        .send(request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "amara@example.com", "password": "not-the-password"})),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown_email) = app
        .send(request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "nobody@example.com", "password": "not-the-password"})),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password["message"], unknown_email["message"]);
    assert_eq!(error_code(&wrong_password), "invalid_credentials");
}

#[tokio::test]
async fn test_missing_or_malformed_header() {
    let app = TestApp::new();

    let (status, body) = app
        .send(request("GET", "/api/v1/auth/profile", None, None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "missing_token");
    assert_eq!(body["message"], "Access token required");

    let mut req = request("GET", "/api/v1/auth/profile", None, None);
    req.headers_mut()
        .insert(header::AUTHORIZATION, "Token abc".parse().unwrap());
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "missing_token");
}

#[tokio::test]
async fn test_garbage_and_expired_tokens() {
    let app = TestApp::new();
    let user = app.create_user("amara", UserRole::Commuter).await;

    let (status, body) = app
        .send(request("GET", "/api/v1/auth/profile", Some("not.a.jwt"), None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "invalid_token");

    let expired = app
        .state
        .tokens
        .issue_access_token_with_ttl(
            &user.id.to_string(),
            &user.username,
            &user.email,
            user.role,
            -60,
        )
        .unwrap();
    let (status, body) = app
        .send(request("GET", "/api/v1/auth/profile", Some(&expired), None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "expired_token");
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = TestApp::new();
    let user = app.create_user("amara", UserRole::Commuter).await;
    let refresh = app
        .state
        .tokens
        .issue_refresh_token(&user.id.to_string())
        .unwrap();

    let (status, body) = app
        .send(request("GET", "/api/v1/auth/profile", Some(&refresh), None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "invalid_token");
}

#[tokio::test]
async fn test_logout_revokes_tokens() {
    let app = TestApp::new();
    let (user, access) = app.user_with_token("amara", UserRole::Commuter).await;
    let refresh = app
        .state
        .tokens
        .issue_refresh_token(&user.id.to_string())
        .unwrap();

    let (status, _) = app
        .send(request(
            "POST",
            "/api/v1/auth/logout",
            Some(&access),
            Some(json!({"refresh_token": refresh})),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.revoked_entries().await, 2);

    let (status, body) = app
        .send(request("GET", "/api/v1/auth/profile", Some(&access), None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "revoked_token");
    assert_eq!(body["message"], "Token has been revoked");

    let (status, body) = app
        .send(request(
            "POST",
            "/api/v1/auth/refresh",
            None,
            Some(json!({"refresh_token": refresh})),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "revoked_token");
}

#[tokio::test]
async fn test_refresh_rotates_the_refresh_token() {
    let app = TestApp::new();
    let user = app.create_user("amara", UserRole::Driver).await;
    let refresh = app
        .state
        .tokens
        .issue_refresh_token(&user.id.to_string())
        .unwrap();

    let (status, body) = app
        .send(request(
            "POST",
            "/api/v1/auth/refresh",
            None,
            Some(json!({"refresh_token": refresh})),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["data"]["access_token"].as_str().unwrap().to_string();
    assert_ne!(body["data"]["refresh_token"], refresh.as_str());

    let (status, body) = app
        .send(request("GET", "/api/v1/auth/profile", Some(&access), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "driver");

    let (status, _) = app
        .send(request(
            "POST",
            "/api/v1/auth/refresh",
            None,
            Some(json!({"refresh_token": refresh})),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deleted_user_token_rejected() {
    let app = TestApp::new();
    let (user, access) = app.user_with_token("amara", UserRole::Operator).await;
    assert!(app.store.remove_user(user.id).await);

    let (status, body) = app
        .send(request("GET", "/api/v1/auth/profile", Some(&access), None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "user_not_found");
    assert_eq!(body["message"], "Invalid token - user not found");
}

#[tokio::test]
async fn test_forgot_password_is_generic() {
    let app = TestApp::new();
    app.create_user("amara", UserRole::Commuter).await;

    let (known_status, known) = app
        .send(request(
            "POST",
            "/api/v1/auth/forgot-password",
            None,
            Some(json!({"email": "amara@example.com"})),
        ))
        .await;
    let (unknown_status, unknown) = app
        .send(request(
            "POST",
            "/api/v1/auth/forgot-password",
            None,
            Some(json!({"email": "nobody@example.com"})),
        ))
        .await;

    assert_eq!(known_status, StatusCode::OK);
    assert_eq!(unknown_status, StatusCode::OK);
    assert_eq!(known, unknown);
}

#[tokio::test]
async fn test_reset_password_flow() {
    let app = TestApp::new();
    let user = app.create_user("amara", UserRole::Commuter).await;
    let token = app
        .state
        .tokens
        .issue_purpose_token(&user.id.to_string(), TokenPurpose::PasswordReset)
        .unwrap();

    let (status, _) = app
        .send(request(
            "POST",
            "/api/v1/auth/reset-password",
            None,
            Some(json!({"token": token, "new_password": "brand-new-secret"})),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "amara@example.com", "password": TEST_PASSWORD})),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "amara@example.com", "password": "brand-new-secret"})),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Single use
    let (status, body) = app
        .send(request(
            "POST",
            "/api/v1/auth/reset-password",
            None,
            Some(json!({"token": token, "new_password": "another-secret"})),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "revoked_token");
}

#[tokio::test]
async fn test_purpose_tokens_are_not_interchangeable() {
    let app = TestApp::new();
    let user = app.create_user("amara", UserRole::Commuter).await;
    let reset = app
        .state
        .tokens
        .issue_purpose_token(&user.id.to_string(), TokenPurpose::PasswordReset)
        .unwrap();

    let (status, body) = app
        .send(request(
            "POST",
            "/api/v1/auth/verify-email",
            None,
            Some(json!({"token": reset})),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "wrong_token_purpose");

    let (status, body) = app
        .send(request("GET", "/api/v1/auth/profile", Some(&reset), None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "invalid_token");
}

#[tokio::test]
async fn test_verify_email() {
    let app = TestApp::new();
    let user = app.create_user("amara", UserRole::Commuter).await;
    let token = app
        .state
        .tokens
        .issue_purpose_token(&user.id.to_string(), TokenPurpose::EmailVerification)
        .unwrap();

    let (status, _) = app
        .send(request(
            "POST",
            "/api/v1/auth/verify-email",
            None,
            Some(json!({"token": token})),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.send(request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert!(body["timestamp"].is_string());
}
