//! Credit purchase and webhook integration tests.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::TestHarness;
use serde_json::json;

use persuade_core::Transaction;
use persuade_engine::{CheckoutOrder, PaymentProcessor, ProcessorError};
use persuade_service::crypto::hmac_sha256_hex;
use persuade_service::ServiceConfig;

const WEBHOOK_SECRET: &str = "test-webhook-secret";

/// Processor stub that approves everything.
struct StubProcessor;

#[async_trait]
impl PaymentProcessor for StubProcessor {
    async fn create_order(
        &self,
        transaction: &Transaction,
    ) -> Result<CheckoutOrder, ProcessorError> {
        Ok(CheckoutOrder {
            external_reference: format!("PAY-{}", transaction.transaction_id),
            approval_url: "https://paypal.test/approve".to_string(),
        })
    }

    async fn capture(&self, _reference: &str, _payer: &str) -> Result<(), ProcessorError> {
        Ok(())
    }
}

fn payment_harness() -> TestHarness {
    let config = ServiceConfig {
        paypal_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        ..TestHarness::test_config()
    };
    TestHarness::build(config, Some(Arc::new(StubProcessor)))
}

/// Start a purchase and return the processor payment reference.
async fn start_purchase(harness: &TestHarness, package_id: &str) -> String {
    let response = harness
        .server
        .post("/v1/payments/purchase")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "package_id": package_id }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["data"]["state"], "initiated");
    assert_eq!(body["data"]["approval_url"], "https://paypal.test/approve");
    body["data"]["transaction_id"]
        .as_str()
        .map(|id| format!("PAY-{id}"))
        .unwrap()
}

async fn balance_of(harness: &TestHarness) -> i64 {
    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    body["data"]["balance_credits"].as_i64().unwrap()
}

/// Send a signed webhook delivery.
async fn send_webhook(harness: &TestHarness, payload: &serde_json::Value) -> axum_test::TestResponse {
    let body = serde_json::to_vec(payload).unwrap();
    let signature = hmac_sha256_hex(WEBHOOK_SECRET, &body);
    harness
        .server
        .post("/webhooks/paypal")
        .add_header("paypal-transmission-sig", signature)
        .content_type("application/json")
        .bytes(body.into())
        .await
}

#[tokio::test]
async fn packages_are_listed_publicly() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/payments/packages").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let packages = body["data"].as_array().unwrap();
    let growth = packages.iter().find(|p| p["id"] == "growth").unwrap();
    assert_eq!(growth["credits"], 1000);
    assert_eq!(growth["amount_minor"], 2999);
    assert_eq!(growth["currency"], "USD");
    assert!(growth["price_with_fees_minor"].as_i64().unwrap() > 2999);
}

#[tokio::test]
async fn full_purchase_flow_grants_credits() {
    let harness = payment_harness();
    harness.seed_balance(100);

    let reference = start_purchase(&harness, "growth").await;

    // Buyer returns from PayPal.
    let response = harness
        .server
        .get(&format!(
            "/v1/payments/execute?paymentId={reference}&PayerID=PAYER-1"
        ))
        .add_header("authorization", harness.auth_header())
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["data"]["state"], "completed");
    assert_eq!(body["data"]["credits"], 1000);

    assert_eq!(balance_of(&harness).await, 1100);
}

#[tokio::test]
async fn execute_is_idempotent() {
    let harness = payment_harness();
    harness.seed_balance(0);

    let reference = start_purchase(&harness, "growth").await;

    for _ in 0..3 {
        harness
            .server
            .get(&format!(
                "/v1/payments/execute?paymentId={reference}&PayerID=PAYER-1"
            ))
            .add_header("authorization", harness.auth_header())
            .await
            .assert_status_ok();
    }

    assert_eq!(balance_of(&harness).await, 1000);
}

#[tokio::test]
async fn unknown_package_is_rejected() {
    let harness = payment_harness();
    harness.seed_balance(0);

    harness
        .server
        .post("/v1/payments/purchase")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "package_id": "platinum" }))
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn purchase_without_processor_is_unavailable() {
    let harness = TestHarness::new();
    harness.seed_balance(0);

    let response = harness
        .server
        .post("/v1/payments/purchase")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "package_id": "growth" }))
        .await;

    response.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn cancel_flow() {
    let harness = payment_harness();
    harness.seed_balance(0);

    let reference = start_purchase(&harness, "starter").await;

    let response = harness
        .server
        .get(&format!("/v1/payments/cancel?paymentId={reference}"))
        .add_header("authorization", harness.auth_header())
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["data"]["state"], "cancelled");
    assert_eq!(balance_of(&harness).await, 0);
}

#[tokio::test]
async fn webhook_completion_credits_once_across_replays() {
    let harness = payment_harness();
    harness.seed_balance(0);

    let reference = start_purchase(&harness, "growth").await;

    let approved = json!({
        "event_type": "CHECKOUT.ORDER.APPROVED",
        "resource": { "id": reference },
    });
    send_webhook(&harness, &approved).await.assert_status_ok();

    let completed = json!({
        "event_type": "PAYMENT.CAPTURE.COMPLETED",
        "resource": {
            "id": "CAP-1",
            "supplementary_data": { "related_ids": { "order_id": reference } },
        },
    });
    for _ in 0..5 {
        let response = send_webhook(&harness, &completed).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["received"], true);
    }

    assert_eq!(balance_of(&harness).await, 1000);
}

#[tokio::test]
async fn webhook_completion_before_approval_still_credits() {
    let harness = payment_harness();
    harness.seed_balance(0);

    let reference = start_purchase(&harness, "starter").await;

    // Completion arrives first; approval is implied.
    let completed = json!({
        "event_type": "CHECKOUT.ORDER.COMPLETED",
        "resource": { "id": reference },
    });
    send_webhook(&harness, &completed).await.assert_status_ok();

    // The late approval event is a no-op.
    let approved = json!({
        "event_type": "CHECKOUT.ORDER.APPROVED",
        "resource": { "id": reference },
    });
    send_webhook(&harness, &approved).await.assert_status_ok();

    assert_eq!(balance_of(&harness).await, 10);
}

#[tokio::test]
async fn webhook_for_unknown_reference_is_acknowledged() {
    let harness = payment_harness();

    let payload = json!({
        "event_type": "CHECKOUT.ORDER.APPROVED",
        "resource": { "id": "PAY-unknown" },
    });
    let response = send_webhook(&harness, &payload).await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["received"], true);
}

#[tokio::test]
async fn webhook_with_bad_signature_is_unauthorized() {
    let harness = payment_harness();

    let payload = json!({
        "event_type": "CHECKOUT.ORDER.APPROVED",
        "resource": { "id": "PAY-1" },
    });
    let body = serde_json::to_vec(&payload).unwrap();

    harness
        .server
        .post("/webhooks/paypal")
        .add_header("paypal-transmission-sig", "deadbeef")
        .content_type("application/json")
        .bytes(body.into())
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn webhook_without_signature_is_unauthorized() {
    let harness = payment_harness();

    harness
        .server
        .post("/webhooks/paypal")
        .content_type("application/json")
        .bytes(b"{}".to_vec().into())
        .await
        .assert_status_unauthorized();
}
