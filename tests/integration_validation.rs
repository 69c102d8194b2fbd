mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use bustrack::store::UserStore;
use bustrack_core::UserRole;
use common::{TestApp, detail_paths, error_code, random_id, request};
use serde_json::json;

#[tokio::test]
async fn test_register_reports_every_missing_field() {
    let app = TestApp::new();

    let (status, body) = app
        .send(request("POST", "/api/v1/auth/register", None, Some(json!({}))))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "validation_failed");
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(
        detail_paths(&body),
        vec!["body.email", "body.password", "body.username"]
    );
    let (_, total) = app.store.list_users(10, 0).await.unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_register_with_several_bad_fields() {
    let app = TestApp::new();

    let (status, body) = app
        .send(request(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({"username": "x", "email": "not-an-email", "password": "123"})),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = body["details"].as_array().unwrap();
    assert_eq!(details.len(), 3);
    assert_eq!(details[0]["message"], "\"email\" must be a valid email");
    assert_eq!(details[0]["path"], json!(["body", "email"]));
}

#[tokio::test]
async fn test_login_missing_fields() {
    let app = TestApp::new();

    let (status, body) = app
        .send(request("POST", "/api/v1/auth/login", None, Some(json!({}))))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail_paths(&body), vec!["body.email", "body.password"]);
}

#[tokio::test]
async fn test_malformed_json_is_one_body_detail() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail_paths(&body), vec!["body"]);
}

#[tokio::test]
async fn test_route_body_collects_nested_errors() {
    let app = TestApp::new();
    let (_, admin) = app.user_with_token("root", UserRole::Admin).await;

    let (status, body) = app
        .send(request(
            "POST",
            "/api/v1/routes",
            Some(&admin),
            Some(json!({
                "code": "R-1",
                "name": "Airport Express",
                "origin": "   ",
                "destination": "Airport",
                "stops": [
                    {"name": "Central", "lat": 6.45, "lng": 3.39},
                    {"name": "Airport", "lat": 95.0, "lng": 3.32}
                ],
                "estimated_duration_minutes": 0
            })),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        detail_paths(&body),
        vec![
            "body.code",
            "body.estimated_duration_minutes",
            "body.origin",
            "body.stops.1.lat",
        ]
    );
}

#[tokio::test]
async fn test_route_needs_two_stops() {
    let app = TestApp::new();
    let (_, admin) = app.user_with_token("root", UserRole::Admin).await;

    let (status, body) = app
        .send(request(
            "POST",
            "/api/v1/routes",
            Some(&admin),
            Some(json!({
                "code": "R1",
                "name": "Loop",
                "origin": "A",
                "destination": "B",
                "stops": [{"name": "Only", "lat": 0.0, "lng": 0.0}]
            })),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["message"], "\"stops\" must contain at least 2 stops");
}

#[tokio::test]
async fn test_location_out_of_range() {
    let app = TestApp::new();
    let (_, admin) = app.user_with_token("root", UserRole::Admin).await;

    let (status, body) = app
        .send(request(
            "PUT",
            &format!("/api/v1/buses/{}/location", random_id()),
            Some(&admin),
            Some(json!({"lat": 91.0, "lng": 3.4, "speed_kmph": 250.0})),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail_paths(&body), vec!["body.lat", "body.speed_kmph"]);
}

#[tokio::test]
async fn test_malformed_bus_id_is_not_found() {
    let app = TestApp::new();
    let (_, admin) = app.user_with_token("root", UserRole::Admin).await;

    let (status, body) = app
        .send(request(
            "PUT",
            "/api/v1/buses/not-a-uuid/location",
            Some(&admin),
            Some(json!({"latitude": 6.5, "longitude": 3.4})),
        ))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Bus not found");
}

#[tokio::test]
async fn test_unknown_trip_status() {
    let app = TestApp::new();
    let (_, admin) = app.user_with_token("root", UserRole::Admin).await;

    let (status, body) = app
        .send(request(
            "PATCH",
            &format!("/api/v1/trips/{}/status", random_id()),
            Some(&admin),
            Some(json!({"status": "delayed"})),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail_paths(&body), vec!["body.status"]);
}

#[tokio::test]
async fn test_trip_create_requires_schedule() {
    let app = TestApp::new();
    let (_, ops) = app.user_with_token("ops", UserRole::Operator).await;

    let (status, body) = app
        .send(request(
            "POST",
            "/api/v1/trips",
            Some(&ops),
            Some(json!({"bus": random_id(), "route": "R12", "departureTime": "soon"})),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        detail_paths(&body),
        vec!["body.route_id", "body.scheduled_departure"]
    );
}

#[tokio::test]
async fn test_mistyped_field_reported_with_other_violations() {
    let app = TestApp::new();
    let (_, admin) = app.user_with_token("root", UserRole::Admin).await;

    let (status, body) = app
        .send(request(
            "POST",
            "/api/v1/buses",
            Some(&admin),
            Some(json!({"capacity": "abc"})),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "validation_failed");
    assert_eq!(
        detail_paths(&body),
        vec!["body.capacity", "body.plate_number"]
    );
    assert_eq!(body["details"][0]["message"], "\"capacity\" must be an integer");
}

#[tokio::test]
async fn test_malformed_list_filter_is_json_validation_error() {
    let app = TestApp::new();

    let (status, body) = app
        .send(request("GET", "/api/v1/trips?bus_id=abc", None, None))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "validation_failed");
    assert_eq!(detail_paths(&body), vec!["query.bus_id"]);
    assert_eq!(body["details"][0]["message"], "\"bus_id\" must be a valid UUID");
}

#[tokio::test]
async fn test_malformed_pagination_is_json_validation_error() {
    let app = TestApp::new();
    let (_, admin) = app.user_with_token("root", UserRole::Admin).await;

    let (status, body) = app
        .send(request(
            "GET",
            "/api/v1/users?limit=abc&page=x",
            Some(&admin),
            None,
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail_paths(&body), vec!["query.limit", "query.page"]);
    assert_eq!(body["details"][0]["message"], "\"limit\" must be an integer");
}
