//! Payment transaction types and state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, TransactionId};

/// A credit purchase tracked from initiation to a terminal state.
///
/// Transactions are owned exclusively by the payment reconciler; they are
/// never deleted and serve as the audit trail for every purchase attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction id (ULID, time-ordered).
    pub transaction_id: TransactionId,

    /// The purchasing account.
    pub account_id: AccountId,

    /// Credits to grant when the purchase completes.
    pub credits: i64,

    /// Charge amount in minor units of `currency` (e.g. cents).
    pub amount_minor: i64,

    /// ISO 4217 currency code (e.g. "USD").
    pub currency: String,

    /// Human-readable description.
    pub description: String,

    /// Processor-assigned id, set once the processor responds.
    pub external_reference: Option<String>,

    /// Current state.
    pub state: TransactionState,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,

    /// When the transaction last changed state.
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction in the `Initiated` state.
    #[must_use]
    pub fn new(
        account_id: AccountId,
        credits: i64,
        amount_minor: i64,
        currency: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            transaction_id: TransactionId::generate(),
            account_id,
            credits,
            amount_minor,
            currency: currency.into(),
            description: description.into(),
            external_reference: None,
            state: TransactionState::Initiated,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Lifecycle state of a [`Transaction`].
///
/// ```text
/// Initiated ──► Approved ──► Completed
///     │             │
///     ├──► Failed ◄─┤
///     └──► Cancelled ◄┘
/// ```
///
/// `Completed`, `Failed`, and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    /// Purchase created, waiting for buyer approval at the processor.
    Initiated,

    /// Buyer approved; processor reference recorded; awaiting capture.
    Approved,

    /// Payment captured and credits granted. Terminal.
    Completed,

    /// Payment denied or errored. Terminal.
    Failed,

    /// Buyer or operator cancelled before completion. Terminal.
    Cancelled,
}

impl TransactionState {
    /// Check whether this state permits no further transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Check whether a transition from `self` to `to` is allowed.
    #[must_use]
    pub const fn can_transition(&self, to: Self) -> bool {
        match (self, to) {
            (Self::Initiated, Self::Approved | Self::Failed | Self::Cancelled)
            | (Self::Approved, Self::Completed | Self::Failed | Self::Cancelled) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Initiated => "initiated",
            Self::Approved => "approved",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transaction_is_initiated() {
        let tx = Transaction::new(AccountId::generate(), 1000, 2999, "USD", "Growth package");
        assert_eq!(tx.state, TransactionState::Initiated);
        assert!(tx.external_reference.is_none());
        assert_eq!(tx.credits, 1000);
        assert_eq!(tx.amount_minor, 2999);
    }

    #[test]
    fn allowed_transitions() {
        use TransactionState as S;

        assert!(S::Initiated.can_transition(S::Approved));
        assert!(S::Initiated.can_transition(S::Failed));
        assert!(S::Initiated.can_transition(S::Cancelled));
        assert!(S::Approved.can_transition(S::Completed));
        assert!(S::Approved.can_transition(S::Failed));
        assert!(S::Approved.can_transition(S::Cancelled));
    }

    #[test]
    fn forbidden_transitions() {
        use TransactionState as S;

        // Completion requires prior approval.
        assert!(!S::Initiated.can_transition(S::Completed));

        // Terminal states admit nothing.
        for terminal in [S::Completed, S::Failed, S::Cancelled] {
            for to in [S::Initiated, S::Approved, S::Completed, S::Failed, S::Cancelled] {
                assert!(!terminal.can_transition(to));
            }
        }
    }

    #[test]
    fn terminal_states() {
        use TransactionState as S;

        assert!(!S::Initiated.is_terminal());
        assert!(!S::Approved.is_terminal());
        assert!(S::Completed.is_terminal());
        assert!(S::Failed.is_terminal());
        assert!(S::Cancelled.is_terminal());
    }
}
