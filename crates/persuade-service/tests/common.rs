//! Common test utilities for persuade integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use tempfile::TempDir;

use persuade_core::AccountId;
use persuade_engine::PaymentProcessor;
use persuade_service::{create_router, AppState, ServiceConfig};
use persuade_store::{RocksStore, Store};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct handle on the store, for seeding and assertions.
    pub store: Arc<RocksStore>,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A test account id for authenticated requests.
    pub account_id: AccountId,
}

impl TestHarness {
    /// Create a new test harness with a fresh database.
    pub fn new() -> Self {
        Self::build(Self::test_config(), None)
    }

    /// Create a harness with a stub payment processor wired in.
    pub fn with_processor(processor: Arc<dyn PaymentProcessor>) -> Self {
        Self::build(Self::test_config(), Some(processor))
    }

    /// Create a harness from a custom config and optional processor.
    pub fn build(config: ServiceConfig, processor: Option<Arc<dyn PaymentProcessor>>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));

        let mut state = AppState::new(Arc::clone(&store), config);
        if let Some(processor) = processor {
            state = state.with_processor(processor);
        }

        let router: Router = create_router(Arc::new(state));
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            _temp_dir: temp_dir,
            account_id: AccountId::generate(),
        }
    }

    /// Baseline config for tests: no auth secret (test tokens accepted),
    /// no provider credentials (adapters answer with simulated output).
    pub fn test_config() -> ServiceConfig {
        ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            cors_origins: vec!["*".into()],
            ..ServiceConfig::default()
        }
    }

    /// Get the authorization header for the harness account.
    pub fn auth_header(&self) -> String {
        format!("Bearer test-token:{}", self.account_id)
    }

    /// Get a different account's auth header (for testing isolation).
    pub fn other_auth_header() -> String {
        format!("Bearer test-token:{}", AccountId::generate())
    }

    /// Create the harness account through the API.
    pub async fn create_account(&self) {
        self.server
            .post("/v1/accounts")
            .add_header("authorization", self.auth_header())
            .json(&serde_json::json!({}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
    }

    /// Seed the harness account with a balance directly in the store.
    pub fn seed_balance(&self, credits: i64) {
        let mut account = persuade_core::Account::new(self.account_id);
        account.balance_credits = credits;
        self.store.put_account(&account).expect("Failed to seed account");
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
