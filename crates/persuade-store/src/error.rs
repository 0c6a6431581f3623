//! Error types for persuade storage.

use persuade_core::TransactionState;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record (e.g. "account", "transaction").
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// Insufficient credits for a debit.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance in credits.
        balance: i64,
        /// Required amount in credits.
        required: i64,
    },

    /// A credit bearing this causal reference was already applied to the
    /// account (idempotency check).
    #[error("duplicate causal reference: {causal_reference}")]
    DuplicateCausalReference {
        /// The causal reference that was replayed.
        causal_reference: String,
    },

    /// The requested transaction state change is not allowed.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: TransactionState,
        /// Requested state.
        to: TransactionState,
    },
}
