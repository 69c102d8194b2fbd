mod common;

use axum::http::StatusCode;
use bustrack_config::RateLimitConfig;
use common::{TestApp, from_peer, request};
use serde_json::json;

/// One auth request per peer, then a long refill period.
fn strict_auth_limits() -> RateLimitConfig {
    RateLimitConfig {
        enabled: true,
        general_per_second: 1,
        general_burst_size: 100,
        auth_per_second: 60,
        auth_burst_size: 1,
    }
}

fn login() -> axum::http::Request<axum::body::Body> {
    request(
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"email": "nobody@example.com", "password": "password123"})),
    )
}

#[tokio::test]
async fn test_auth_limit_exceeded() {
    let app = TestApp::with_rate_limit(strict_auth_limits());
    let router = app.router();

    let (status, _) = common::send(router.clone(), from_peer(login(), [10, 0, 0, 1])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = common::send(router, from_peer(login(), [10, 0, 0, 1])).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_limits_are_per_peer() {
    let app = TestApp::with_rate_limit(strict_auth_limits());
    let router = app.router();

    let (status, _) = common::send(router.clone(), from_peer(login(), [10, 0, 0, 2])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = common::send(router.clone(), from_peer(login(), [10, 0, 0, 2])).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (status, _) = common::send(router, from_peer(login(), [10, 0, 0, 3])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_bucket_does_not_cover_other_routes() {
    let app = TestApp::with_rate_limit(strict_auth_limits());
    let router = app.router();

    let (status, _) = common::send(router.clone(), from_peer(login(), [10, 0, 0, 4])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for _ in 0..3 {
        let (status, body) = common::send(
            router.clone(),
            from_peer(request("GET", "/api/v1/auth/profile", None, None), [10, 0, 0, 4]),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "missing_token");
    }
}

#[tokio::test]
async fn test_disabled_limits_never_reject() {
    let app = TestApp::new();
    let router = app.router();

    for _ in 0..10 {
        let (status, _) = common::send(router.clone(), login()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
