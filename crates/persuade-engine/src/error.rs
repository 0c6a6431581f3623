//! Error types for the engine layer.

use persuade_core::AccountId;
use persuade_store::StoreError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by orchestration, billing, and reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The account does not exist.
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    /// The account cannot fund the requested operation.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance in credits.
        balance: i64,
        /// Cost of the requested operation.
        required: i64,
    },

    /// No package with the given id exists in the rate table.
    #[error("unknown package: {0}")]
    UnknownPackage(String),

    /// No transaction carries the given processor reference.
    #[error("unknown payment reference: {0}")]
    UnknownPaymentReference(String),

    /// The payment processor call failed.
    #[error(transparent)]
    Processor(#[from] ProcessorError),

    /// A completed charge does not match any rate table package; the
    /// transaction is held for manual review instead of credited.
    #[error("rate table mismatch: {amount_minor} {currency} matches no package")]
    MisconfiguredRateTable {
        /// Charged amount in minor units.
        amount_minor: i64,
        /// Charge currency.
        currency: String,
    },
}

/// A failure reported by the external payment processor client.
#[derive(Debug, thiserror::Error)]
#[error("payment processor error: {message}")]
pub struct ProcessorError {
    /// Short description of the failure.
    pub message: String,
}

impl ProcessorError {
    /// Create a processor error from any displayable cause.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
