//! Shared application state.

use std::sync::Arc;

use persuade_core::RateTable;
use persuade_engine::{
    CreditLedger, EngineConfig, OrchestrationEngine, PaymentProcessor, PaymentReconciler,
};
use persuade_providers::AdapterRegistry;
use persuade_store::{RocksStore, Store};

use crate::config::ServiceConfig;
use crate::paypal::PayPalClient;

/// Shared application state, cloned per request via `Arc`.
pub struct AppState {
    /// Persistent store.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Orchestration engine over the registered provider adapters.
    pub engine: OrchestrationEngine,

    /// Credit ledger.
    pub ledger: CreditLedger,

    /// Payment reconciler; `None` when PayPal is not configured.
    pub reconciler: Option<Arc<PaymentReconciler>>,
}

impl AppState {
    /// Build the application state from a store and configuration.
    ///
    /// Registers the standard provider adapters and, when PayPal
    /// credentials are present, wires up the payment reconciler.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        let registry = Arc::new(AdapterRegistry::standard(&config.providers));

        let engine_config = EngineConfig {
            per_call_timeout: std::time::Duration::from_millis(config.provider_timeout_ms),
            overall_timeout: std::time::Duration::from_millis(config.session_timeout_ms),
            cost_per_provider: config.cost_per_provider,
        };

        let dyn_store: Arc<dyn Store> = Arc::clone(&store) as Arc<dyn Store>;
        let engine = OrchestrationEngine::new(registry, Arc::clone(&dyn_store), engine_config);
        let ledger = CreditLedger::new(Arc::clone(&dyn_store));

        let reconciler = PayPalClient::from_config(&config).map(|client| {
            let processor: Arc<dyn PaymentProcessor> = Arc::new(client);
            Arc::new(PaymentReconciler::new(
                Arc::clone(&dyn_store),
                RateTable::default(),
                processor,
            ))
        });

        Self {
            store,
            config,
            engine,
            ledger,
            reconciler,
        }
    }

    /// Replace the payment processor, keeping the default rate table.
    ///
    /// Used by tests to inject a stub processor without PayPal credentials.
    #[must_use]
    pub fn with_processor(mut self, processor: Arc<dyn PaymentProcessor>) -> Self {
        let dyn_store: Arc<dyn Store> = Arc::clone(&self.store) as Arc<dyn Store>;
        self.reconciler = Some(Arc::new(PaymentReconciler::new(
            dyn_store,
            RateTable::default(),
            processor,
        )));
        self
    }
}
