//! Concurrent fan-out across provider adapters.

use std::sync::Arc;
use std::time::Duration;

use persuade_core::{AccountId, AggregatedResponse, ProviderId, ProviderRequest, ProviderResult};
use persuade_providers::AdapterRegistry;
use persuade_store::Store;

use crate::error::{EngineError, Result};
use crate::ledger::{CreditLedger, DebitOutcome};

/// Tunables for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Default per-provider invocation timeout.
    pub per_call_timeout: Duration,

    /// Upper bound on how long one run may wait for stragglers. The
    /// effective per-task timeout is the minimum of this and the per-call
    /// timeout, and any task still outstanding at the deadline is aborted
    /// and recorded as a timeout, so the whole run is bounded even when an
    /// adapter ignores the timeout it was handed.
    pub overall_timeout: Duration,

    /// Credits charged per requested provider.
    pub cost_per_provider: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            per_call_timeout: Duration::from_secs(30),
            overall_timeout: Duration::from_secs(45),
            cost_per_provider: 1,
        }
    }
}

/// One billed orchestration run.
#[derive(Debug, Clone)]
pub struct BilledRun {
    /// Causal reference for the debit, unique per run.
    pub session_id: String,

    /// The aggregated provider results.
    pub response: AggregatedResponse,

    /// Account balance after any debit.
    pub balance: i64,
}

/// Fans one request out to N adapters concurrently and reconciles the
/// results into a single response.
pub struct OrchestrationEngine {
    registry: Arc<AdapterRegistry>,
    store: Arc<dyn Store>,
    ledger: CreditLedger,
    config: EngineConfig,
}

impl OrchestrationEngine {
    /// Create an engine over a registry and store.
    #[must_use]
    pub fn new(registry: Arc<AdapterRegistry>, store: Arc<dyn Store>, config: EngineConfig) -> Self {
        let ledger = CreditLedger::new(Arc::clone(&store));
        Self {
            registry,
            store,
            ledger,
            config,
        }
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The adapter registry backing this engine.
    #[must_use]
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    fn effective_timeout(&self, per_call_timeout: Option<Duration>) -> Duration {
        per_call_timeout
            .unwrap_or(self.config.per_call_timeout)
            .min(self.config.overall_timeout)
    }

    /// Run one request against the given providers.
    ///
    /// All adapters are invoked concurrently; the returned results are in
    /// the order the provider ids were supplied. An unknown id produces an
    /// error result in its slot rather than aborting the run, and a
    /// panicked adapter task degrades to an error result the same way.
    ///
    /// The overall timeout is a hard ceiling enforced here, not just a
    /// value handed to the adapters: any task still outstanding at the
    /// deadline is aborted and recorded as a timeout, so a misbehaving
    /// adapter cannot stall the run.
    pub async fn run(
        &self,
        request: &ProviderRequest,
        providers: &[ProviderId],
        per_call_timeout: Option<Duration>,
    ) -> AggregatedResponse {
        let timeout = self.effective_timeout(per_call_timeout);
        let deadline = tokio::time::Instant::now() + self.config.overall_timeout;

        let mut slots = Vec::with_capacity(providers.len());
        for id in providers {
            let handle = self.registry.get(id).map(|adapter| {
                let request = request.clone();
                tokio::spawn(async move { adapter.invoke(&request, timeout).await })
            });
            slots.push((id.clone(), handle));
        }

        let mut results = Vec::with_capacity(slots.len());
        for (id, handle) in slots {
            let result = match handle {
                Some(mut handle) => match tokio::time::timeout_at(deadline, &mut handle).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(err)) => {
                        tracing::error!(provider = %id, error = %err, "adapter task failed");
                        ProviderResult::error(id, format!("task failed: {err}"), Duration::ZERO)
                    }
                    Err(_) => {
                        handle.abort();
                        tracing::warn!(provider = %id, "adapter still outstanding at deadline");
                        ProviderResult::timeout(id, self.config.overall_timeout)
                    }
                },
                None => ProviderResult::error(id, "unknown provider id", Duration::ZERO),
            };
            results.push(result);
        }

        AggregatedResponse::from_results(results)
    }

    /// Run one request and settle its cost against the account.
    ///
    /// Billing policy:
    /// - cost is `cost_per_provider × requested provider count`, checked
    ///   against the balance before any adapter is invoked;
    /// - a run that produced no usable result is free;
    /// - a demo-mode aggregate (no live result at all) is free;
    /// - a partial aggregate is charged the full cost.
    ///
    /// The pre-flight check gates on the requested intent, not the outcome:
    /// a non-demo request must be fundable up front even if every adapter
    /// later falls back to mock data and the run ends up free. Callers that
    /// want a guaranteed-free run ask for demo mode explicitly.
    ///
    /// # Errors
    ///
    /// - `EngineError::AccountNotFound` when the account is missing.
    /// - `EngineError::InsufficientCredits` when the balance cannot fund
    ///   the run; no adapter is invoked.
    pub async fn run_billed(
        &self,
        account_id: &AccountId,
        request: &ProviderRequest,
        providers: &[ProviderId],
        per_call_timeout: Option<Duration>,
    ) -> Result<BilledRun> {
        let account = self
            .store
            .get_account(account_id)?
            .ok_or(EngineError::AccountNotFound(*account_id))?;

        let mut request = request.clone();
        request.demo = request.demo || account.demo;

        let cost = self.config.cost_per_provider * i64::try_from(providers.len()).unwrap_or(i64::MAX);
        if !request.demo && !account.has_sufficient_credits(cost) {
            return Err(EngineError::InsufficientCredits {
                balance: account.balance_credits,
                required: cost,
            });
        }

        let session_id = format!("session-{}", uuid::Uuid::new_v4());
        let mut response = self.run(&request, providers, per_call_timeout).await;

        let mut balance = account.balance_credits;
        if response.is_billable() && !response.demo_mode && cost > 0 {
            match self.ledger.debit(account_id, cost, &session_id)? {
                DebitOutcome::Applied { balance: after } => {
                    response.cost_credits = cost;
                    balance = after;
                }
                DebitOutcome::InsufficientFunds { balance: current, required } => {
                    // The balance moved between the pre-flight check and
                    // settlement. The results already exist, so the run
                    // goes unbilled and the anomaly is logged.
                    tracing::warn!(
                        account = %account_id,
                        balance = current,
                        required,
                        "balance changed mid-run, settlement skipped"
                    );
                    balance = current;
                }
            }
        }

        Ok(BilledRun {
            session_id,
            response,
            balance,
        })
    }
}
