//! Surface-level endpoint behavior: health, token handling, and request
//! validation. These paths all settle before any query leaves the process,
//! so no live Postgres or Redis is needed.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn health_reports_a_status() {
    let app = common::app().await;

    let resp = app.get("/health", None).await;
    assert_eq!(resp.status, StatusCode::OK);

    let status = resp.json()["status"].as_str().unwrap_or_default().to_string();
    assert!(status == "ok" || status == "degraded", "status was {status:?}");
}

// ---------------------------------------------------------------------------
// Token handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_bearer_token_is_unauthorized() {
    let app = common::app().await;

    let resp = app.get("/auth/me", None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "missing Authorization header");
}

#[tokio::test]
async fn non_bearer_authorization_is_rejected() {
    let app = common::app().await;

    let resp = app
        .request(
            Method::GET,
            "/auth/me",
            None,
            &[("Authorization", "Token abc123")],
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "invalid Authorization header");
}

#[tokio::test]
async fn garbage_bearer_token_is_rejected() {
    let app = common::app().await;

    let resp = app.get("/auth/me", Some("not-a-real-token")).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "invalid token");
}

#[tokio::test]
async fn posting_requires_authentication() {
    let app = common::app().await;

    let resp = app.post_json("/posts", json!({"content": "hi"}), None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn follow_toggle_requires_authentication() {
    let app = common::app().await;

    let resp = app
        .request(Method::POST, "/profiles/somebody/follow", None, &[])
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "missing Authorization header");
}

#[tokio::test]
async fn admin_routes_require_authentication() {
    let app = common::app().await;

    let resp = app
        .request(Method::POST, "/admin/internships", None, &[])
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Request validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn signup_rejects_short_passwords() {
    let app = common::app().await;

    let resp = app
        .post_json(
            "/auth/signup",
            json!({
                "handle": "newbie",
                "email": "newbie@example.com",
                "full_name": "New Student",
                "password": "short",
            }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "password must be at least 8 characters");
}

#[tokio::test]
async fn signup_rejects_blank_handles() {
    let app = common::app().await;

    let resp = app
        .post_json(
            "/auth/signup",
            json!({
                "handle": "   ",
                "email": "newbie@example.com",
                "full_name": "New Student",
                "password": "long-enough-pw",
            }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "handle cannot be empty");
}

#[tokio::test]
async fn login_requires_identifier_and_password() {
    let app = common::app().await;

    let resp = app
        .post_json(
            "/auth/login",
            json!({"identifier": "", "password": ""}),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "identifier and password are required");
}

#[tokio::test]
async fn refresh_requires_a_token() {
    let app = common::app().await;

    let resp = app
        .post_json("/auth/refresh", json!({"refresh_token": ""}), None)
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "refresh_token is required");
}

#[tokio::test]
async fn feed_rejects_bad_cursors() {
    let app = common::app().await;

    let resp = app.get("/feed?cursor=not-a-cursor", None).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "invalid cursor");

    let resp = app.get("/feed?cursor=2024-01-01T00:00:00Z/not-a-uuid", None).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "invalid cursor");
}

#[tokio::test]
async fn feed_rejects_out_of_range_limits() {
    let app = common::app().await;

    let resp = app.get("/feed?limit=0", None).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "limit must be between 1 and 100");

    let resp = app.get("/feed?limit=101", None).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn donor_leaderboard_rejects_out_of_range_limits() {
    let app = common::app().await;

    let resp = app.get("/payments/donors?limit=0", None).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "limit must be between 1 and 100");
}
