//! Credit balance and ledger history integration tests.

mod common;

use common::TestHarness;
use persuade_core::EntryReason;
use persuade_store::Store;

#[tokio::test]
async fn balance_reflects_seeded_account() {
    let harness = TestHarness::new();
    harness.seed_balance(120);

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["data"]["balance_credits"], 120);
}

#[tokio::test]
async fn balance_without_account_is_not_found() {
    let harness = TestHarness::new();

    harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.auth_header())
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn balance_without_auth_is_unauthorized() {
    let harness = TestHarness::new();

    harness.server.get("/v1/credits/balance").await.assert_status_unauthorized();
}

#[tokio::test]
async fn entries_list_newest_first() {
    let harness = TestHarness::new();
    harness.seed_balance(0);

    harness
        .store
        .credit(&harness.account_id, 50, EntryReason::CreditPurchase, "tx-1")
        .unwrap();
    harness
        .store
        .debit(&harness.account_id, 5, EntryReason::DebitAiOperation, "session-1")
        .unwrap();

    let response = harness
        .server
        .get("/v1/credits/entries")
        .add_header("authorization", harness.auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let entries = body["data"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    // Newest first: the debit precedes the purchase.
    assert_eq!(entries[0]["delta"], -5);
    assert_eq!(entries[1]["delta"], 50);
    assert_eq!(entries[0]["balance_after"], 45);
}

#[tokio::test]
async fn entries_pagination() {
    let harness = TestHarness::new();
    harness.seed_balance(0);

    for i in 0..5 {
        harness
            .store
            .credit(
                &harness.account_id,
                10,
                EntryReason::CreditPurchase,
                &format!("tx-{i}"),
            )
            .unwrap();
    }

    let response = harness
        .server
        .get("/v1/credits/entries?limit=2&offset=2")
        .add_header("authorization", harness.auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["data"]["entries"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["limit"], 2);
    assert_eq!(body["data"]["offset"], 2);
}

#[tokio::test]
async fn entries_are_isolated_per_account() {
    let harness = TestHarness::new();
    harness.seed_balance(0);
    harness
        .store
        .credit(&harness.account_id, 50, EntryReason::CreditPurchase, "tx-1")
        .unwrap();

    // A different account sees nothing.
    let other = TestHarness::other_auth_header();
    let response = harness
        .server
        .get("/v1/credits/entries")
        .add_header("authorization", other)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["data"]["entries"].as_array().unwrap().is_empty());
}
