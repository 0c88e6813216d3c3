//! Payment gateway signature checks and the order endpoints' validation.
//! The gateway base URL points at a closed port, so order creation exercises
//! the unreachable-provider path without a mock server.

mod common;

use axum::http::StatusCode;
use serde_json::json;

// HMAC-SHA256("rzp_test_secret", "order_test123|pay_test456"), hex.
const KNOWN_SIGNATURE: &str = "a7f0ea6bad2bec0c2604e63357c44ea1cb9171afe53455fc3121333135e1ca5d";

#[tokio::test]
async fn payment_signature_matches_the_provider_formula() {
    let app = common::app().await;
    let signature = app
        .state
        .gateway
        .payment_signature("order_test123", "pay_test456");
    assert_eq!(signature, KNOWN_SIGNATURE);
}

#[tokio::test]
async fn signature_verification_is_offline() {
    let app = common::app().await;
    assert!(app
        .state
        .gateway
        .verify_payment_signature("order_test123", "pay_test456", KNOWN_SIGNATURE));
    assert!(!app.state.gateway.verify_payment_signature(
        "order_test123",
        "pay_test456",
        "deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef",
    ));
    // Tampering with the payment id invalidates the signature too.
    assert!(!app
        .state
        .gateway
        .verify_payment_signature("order_test123", "pay_other", KNOWN_SIGNATURE));
}

#[tokio::test]
async fn order_amount_must_be_positive() {
    let app = common::app().await;

    let resp = app
        .post_json(
            "/payments/orders",
            json!({"amount": -5, "currency": "INR"}),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "amount must be greater than 0");

    let resp = app
        .post_json(
            "/payments/orders",
            json!({"amount": 0, "currency": "INR"}),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_currency_must_be_a_three_letter_code() {
    let app = common::app().await;

    let resp = app
        .post_json(
            "/payments/orders",
            json!({"amount": 100, "currency": "RUPEES"}),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "currency must be a 3-letter code");
}

#[tokio::test]
async fn unreachable_provider_maps_to_bad_gateway() {
    let app = common::app().await;

    let resp = app
        .post_json(
            "/payments/orders",
            json!({"amount": 100, "currency": "INR"}),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_GATEWAY);
    assert_eq!(resp.error_message(), "payment provider unreachable");
}

#[tokio::test]
async fn verify_requires_all_three_fields() {
    let app = common::app().await;

    let resp = app
        .post_json(
            "/payments/verify",
            json!({"order_id": "", "payment_id": "pay_1", "signature": "sig"}),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.error_message(),
        "order_id, payment_id and signature are required"
    );
}

#[tokio::test]
async fn bad_signature_is_rejected_before_any_lookup() {
    let app = common::app().await;

    let resp = app
        .post_json(
            "/payments/verify",
            json!({
                "order_id": "order_test123",
                "payment_id": "pay_test456",
                "signature": "deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef",
            }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "invalid payment signature");
}
