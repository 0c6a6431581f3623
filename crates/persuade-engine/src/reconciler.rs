//! Payment reconciliation.
//!
//! Drives each purchase transaction through its state machine and turns
//! processor webhook deliveries, which may arrive out of order and more
//! than once, into at-most-one credit per transaction. The store's
//! causal-reference index is what makes the crediting idempotent; this
//! module decides which deliveries are applied, which are replays, and
//! which are anomalies to log and acknowledge.

use std::sync::Arc;

use async_trait::async_trait;

use persuade_core::{AccountId, RateTable, Transaction, TransactionId, TransactionState};
use persuade_store::{Store, StoreError};

use crate::error::{EngineError, ProcessorError, Result};

/// A created checkout at the processor.
#[derive(Debug, Clone)]
pub struct CheckoutOrder {
    /// Processor-assigned payment id.
    pub external_reference: String,

    /// URL the buyer must visit to approve the payment.
    pub approval_url: String,
}

/// External payment processor client, as seen by the reconciler.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create a checkout for the transaction's amount.
    async fn create_order(
        &self,
        transaction: &Transaction,
    ) -> std::result::Result<CheckoutOrder, ProcessorError>;

    /// Capture an approved payment.
    async fn capture(
        &self,
        external_reference: &str,
        payer_reference: &str,
    ) -> std::result::Result<(), ProcessorError>;
}

/// A normalized webhook delivery.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Processor payment id the event refers to.
    pub external_reference: String,

    /// What the processor says happened.
    pub kind: WebhookKind,
}

/// Normalized webhook event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookKind {
    /// Buyer approved the payment.
    Approved,

    /// Payment captured; credits should be granted.
    Completed,

    /// Payment denied by the processor.
    Denied,

    /// Buyer or processor cancelled the payment.
    Cancelled,
}

/// How one webhook delivery was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The event advanced the transaction to this state.
    Applied(TransactionState),

    /// The event had already been applied; nothing changed.
    AlreadyApplied,

    /// No transaction carries the referenced payment id; logged and
    /// acknowledged so the processor stops retrying.
    UnknownReference,

    /// The event contradicts a terminal state already reached (e.g. a
    /// denial after completion); logged, nothing changed.
    ConflictingTerminal,

    /// The charged amount matches no rate table package; the transaction
    /// is held short of `Completed` for manual review.
    MisconfiguredRateTable,
}

/// Reconciles purchase transactions against processor deliveries.
pub struct PaymentReconciler {
    store: Arc<dyn Store>,
    rates: RateTable,
    processor: Arc<dyn PaymentProcessor>,
}

impl PaymentReconciler {
    /// Create a reconciler.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, rates: RateTable, processor: Arc<dyn PaymentProcessor>) -> Self {
        Self {
            store,
            rates,
            processor,
        }
    }

    /// The rate table this reconciler validates against.
    #[must_use]
    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    /// Start a purchase: create the transaction and a processor checkout.
    ///
    /// The transaction is persisted in `Initiated` with the processor
    /// reference already recorded, so a webhook arriving before the buyer
    /// returns can still find it.
    ///
    /// # Errors
    ///
    /// - `EngineError::UnknownPackage` for an id not in the rate table.
    /// - `EngineError::AccountNotFound` when the account is missing.
    /// - `EngineError::Processor` when checkout creation fails.
    pub async fn create(
        &self,
        account_id: AccountId,
        package_id: &str,
    ) -> Result<(Transaction, String)> {
        let package = self
            .rates
            .package(package_id)
            .ok_or_else(|| EngineError::UnknownPackage(package_id.to_string()))?;

        self.store
            .get_account(&account_id)?
            .ok_or(EngineError::AccountNotFound(account_id))?;

        let mut transaction = Transaction::new(
            account_id,
            package.credits,
            package.amount_minor,
            package.currency.clone(),
            package.name.clone(),
        );

        let order = self.processor.create_order(&transaction).await?;
        transaction.external_reference = Some(order.external_reference);
        self.store.put_transaction(&transaction)?;

        tracing::info!(
            transaction = %transaction.transaction_id,
            package = package_id,
            "purchase initiated"
        );

        Ok((transaction, order.approval_url))
    }

    /// Handle the buyer's return from the processor: approve, capture,
    /// and complete the transaction.
    ///
    /// Calling this twice for the same payment captures once and then
    /// reports the already-completed transaction; the credit cannot be
    /// applied twice.
    ///
    /// # Errors
    ///
    /// - `EngineError::UnknownPaymentReference` for a reference no
    ///   transaction carries.
    /// - `EngineError::MisconfiguredRateTable` when the captured charge
    ///   matches no package; the transaction stays in `Approved`.
    /// - `EngineError::Processor` when the capture call fails.
    pub async fn execute(
        &self,
        external_reference: &str,
        payer_reference: &str,
    ) -> Result<Transaction> {
        let transaction = self.find_by_reference(external_reference)?;

        if transaction.state == TransactionState::Completed {
            return Ok(transaction);
        }

        if transaction.state == TransactionState::Initiated {
            self.store.transition_transaction(
                &transaction.transaction_id,
                TransactionState::Approved,
                Some(external_reference),
            )?;
        }

        self.processor.capture(external_reference, payer_reference).await?;

        match self.apply_completion(&transaction.transaction_id)? {
            Completion::Credited(_) | Completion::AlreadyCredited => {}
            Completion::RateMismatch => {
                return Err(EngineError::MisconfiguredRateTable {
                    amount_minor: transaction.amount_minor,
                    currency: transaction.currency,
                });
            }
        }

        self.load(&transaction.transaction_id)
    }

    /// Apply one webhook delivery.
    ///
    /// Idempotent and order-tolerant: replays and stale events are
    /// reported in the outcome, never as errors, so the caller can always
    /// acknowledge the delivery.
    ///
    /// # Errors
    ///
    /// Returns only storage faults.
    pub fn on_webhook(&self, event: &WebhookEvent) -> Result<WebhookOutcome> {
        let Some(transaction) = self
            .store
            .find_transaction_by_external_ref(&event.external_reference)?
        else {
            tracing::warn!(
                reference = %event.external_reference,
                kind = ?event.kind,
                "webhook for unknown payment reference"
            );
            return Ok(WebhookOutcome::UnknownReference);
        };

        let outcome = match event.kind {
            WebhookKind::Approved => self.apply_approval(&transaction)?,
            WebhookKind::Completed => match self.apply_completion(&transaction.transaction_id)? {
                Completion::Credited(_) => WebhookOutcome::Applied(TransactionState::Completed),
                Completion::AlreadyCredited => {
                    if transaction.state == TransactionState::Failed
                        || transaction.state == TransactionState::Cancelled
                    {
                        WebhookOutcome::ConflictingTerminal
                    } else {
                        WebhookOutcome::AlreadyApplied
                    }
                }
                Completion::RateMismatch => WebhookOutcome::MisconfiguredRateTable,
            },
            WebhookKind::Denied => self.apply_terminal(&transaction, TransactionState::Failed)?,
            WebhookKind::Cancelled => {
                self.apply_terminal(&transaction, TransactionState::Cancelled)?
            }
        };

        if matches!(outcome, WebhookOutcome::ConflictingTerminal) {
            tracing::warn!(
                transaction = %transaction.transaction_id,
                state = %transaction.state,
                kind = ?event.kind,
                "webhook contradicts terminal state"
            );
        }

        Ok(outcome)
    }

    /// Cancel a transaction from the buyer's side.
    ///
    /// Cancelling an already-cancelled transaction is a no-op returning
    /// the current record.
    ///
    /// # Errors
    ///
    /// - `EngineError::UnknownPaymentReference` for an unknown reference.
    /// - `StoreError::InvalidTransition` (wrapped) when the transaction
    ///   already completed or failed.
    pub fn cancel(&self, external_reference: &str) -> Result<Transaction> {
        let transaction = self.find_by_reference(external_reference)?;

        if transaction.state == TransactionState::Cancelled {
            return Ok(transaction);
        }

        Ok(self.store.transition_transaction(
            &transaction.transaction_id,
            TransactionState::Cancelled,
            None,
        )?)
    }

    fn find_by_reference(&self, external_reference: &str) -> Result<Transaction> {
        self.store
            .find_transaction_by_external_ref(external_reference)?
            .ok_or_else(|| EngineError::UnknownPaymentReference(external_reference.to_string()))
    }

    fn load(&self, transaction_id: &TransactionId) -> Result<Transaction> {
        Ok(self
            .store
            .get_transaction(transaction_id)?
            .ok_or(StoreError::NotFound {
                entity: "transaction",
                id: transaction_id.to_string(),
            })?)
    }

    fn apply_approval(&self, transaction: &Transaction) -> Result<WebhookOutcome> {
        match transaction.state {
            TransactionState::Initiated => {
                self.store.transition_transaction(
                    &transaction.transaction_id,
                    TransactionState::Approved,
                    None,
                )?;
                Ok(WebhookOutcome::Applied(TransactionState::Approved))
            }
            // A late or repeated approval carries no new information.
            _ => Ok(WebhookOutcome::AlreadyApplied),
        }
    }

    fn apply_terminal(
        &self,
        transaction: &Transaction,
        to: TransactionState,
    ) -> Result<WebhookOutcome> {
        match transaction.state {
            TransactionState::Completed => Ok(WebhookOutcome::ConflictingTerminal),
            state if state == to => Ok(WebhookOutcome::AlreadyApplied),
            TransactionState::Failed | TransactionState::Cancelled => {
                Ok(WebhookOutcome::AlreadyApplied)
            }
            _ => {
                self.store
                    .transition_transaction(&transaction.transaction_id, to, None)?;
                Ok(WebhookOutcome::Applied(to))
            }
        }
    }

    /// Validate the charge against the rate table and credit the account,
    /// at most once.
    fn apply_completion(&self, transaction_id: &TransactionId) -> Result<Completion> {
        let transaction = self.load(transaction_id)?;

        if transaction.state == TransactionState::Completed {
            return Ok(Completion::AlreadyCredited);
        }
        if transaction.state == TransactionState::Failed
            || transaction.state == TransactionState::Cancelled
        {
            return Ok(Completion::AlreadyCredited);
        }

        match self
            .rates
            .match_amount(transaction.amount_minor, &transaction.currency)
        {
            Some(package) if package.credits == transaction.credits => {}
            _ => {
                tracing::warn!(
                    transaction = %transaction_id,
                    amount_minor = transaction.amount_minor,
                    currency = %transaction.currency,
                    "charge matches no rate table package, holding transaction"
                );
                // Leave the transaction short of Completed; an operator
                // fixes the table and replays the webhook.
                if transaction.state == TransactionState::Initiated {
                    self.store.transition_transaction(
                        transaction_id,
                        TransactionState::Approved,
                        None,
                    )?;
                }
                return Ok(Completion::RateMismatch);
            }
        }

        // A completion event implies the buyer approved, even if the
        // approval delivery never arrived.
        if transaction.state == TransactionState::Initiated {
            self.store
                .transition_transaction(transaction_id, TransactionState::Approved, None)?;
        }

        match self.store.complete_transaction(transaction_id) {
            Ok(balance) => {
                tracing::info!(
                    transaction = %transaction_id,
                    credits = transaction.credits,
                    balance,
                    "purchase completed and credited"
                );
                Ok(Completion::Credited(balance))
            }
            Err(StoreError::DuplicateCausalReference { .. }) => Ok(Completion::AlreadyCredited),
            Err(err) => Err(err.into()),
        }
    }
}

enum Completion {
    Credited(i64),
    AlreadyCredited,
    RateMismatch,
}
