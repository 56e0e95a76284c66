//! Router behaviour that does not depend on stored data.

use axum::http::StatusCode;
use serde_json::json;

use activity_console_integration_tests::{get, json_request, read_json, send};

#[tokio::test]
async fn test_liveness_needs_no_database() {
    let response = send(get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let response = send(get("/health/ready")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_me_without_session_is_unauthorized() {
    let (status, body) = read_json(send(get("/api/auth/me")).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["ok"], json!(false));
    assert!(body["error"].as_str().is_some_and(|e| e.contains("not authenticated")));
}

#[tokio::test]
async fn test_protected_endpoints_reject_anonymous_callers() {
    for uri in [
        "/api/records",
        "/api/records/export",
        "/api/activities",
        "/api/invites/list",
        "/api/admin-users",
        "/api/logs",
        "/api/settings/system",
        "/api/notifications",
        "/api/preferences/section",
    ] {
        let (status, body) = read_json(send(get(uri)).await).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["ok"], json!(false), "{uri}");
    }
}

#[tokio::test]
async fn test_invite_send_requires_sign_in() {
    let request = json_request(
        "POST",
        "/api/invites/send",
        &json!({ "email": "new@uni.ac.th", "role": "viewer", "department": "science" }),
    );
    let (status, body) = read_json(send(request).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["ok"], json!(false));
}

#[tokio::test]
async fn test_send_code_rejects_malformed_email() {
    let request = json_request(
        "POST",
        "/api/auth/login/send-code",
        &json!({ "email": "not-an-email" }),
    );
    let (status, body) = read_json(send(request).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], json!(false));
}

#[tokio::test]
async fn test_checkin_rejects_malformed_code_before_lookup() {
    let request = json_request(
        "POST",
        "/api/checkin",
        &json!({ "code": "no!", "student_id": "6400001" }),
    );
    let (status, body) = read_json(send(request).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some_and(|e| e.contains("invalid activity code")));
}

#[tokio::test]
async fn test_invite_accept_requires_display_name() {
    let request = json_request(
        "POST",
        "/api/invites/accept",
        &json!({ "token": "abc", "display_name": "   " }),
    );
    let (status, body) = read_json(send(request).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], json!(false));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = send(get("/api/nope")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
