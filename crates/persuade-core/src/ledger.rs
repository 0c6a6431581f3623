//! Ledger entry types.
//!
//! Every balance change appends exactly one immutable entry. The account
//! balance is the running sum of entry deltas; `balance_after` is recorded
//! redundantly so drift between the two is detectable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, EntryId};

/// An immutable record of one balance change and its cause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry id (ULID, time-ordered).
    pub entry_id: EntryId,

    /// The account whose balance changed.
    pub account_id: AccountId,

    /// Signed change in credits. Positive = credit, negative = debit.
    pub delta: i64,

    /// Why the balance changed.
    pub reason: EntryReason,

    /// The operation or transaction that caused this entry.
    ///
    /// For purchases this is the payment transaction id, and the ledger
    /// rejects a second credit bearing the same reference — that is what
    /// makes webhook replay safe.
    pub causal_reference: String,

    /// Balance after this entry was applied.
    pub balance_after: i64,

    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Create a debit entry for an AI operation.
    #[must_use]
    pub fn debit_ai_operation(
        account_id: AccountId,
        amount: i64,
        balance_after: i64,
        causal_reference: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: EntryId::generate(),
            account_id,
            delta: -amount.abs(),
            reason: EntryReason::DebitAiOperation,
            causal_reference: causal_reference.into(),
            balance_after,
            created_at: Utc::now(),
        }
    }

    /// Create a credit entry for a completed purchase.
    #[must_use]
    pub fn credit_purchase(
        account_id: AccountId,
        amount: i64,
        balance_after: i64,
        causal_reference: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: EntryId::generate(),
            account_id,
            delta: amount.abs(),
            reason: EntryReason::CreditPurchase,
            causal_reference: causal_reference.into(),
            balance_after,
            created_at: Utc::now(),
        }
    }

    /// Create a refund entry.
    #[must_use]
    pub fn refund(
        account_id: AccountId,
        amount: i64,
        balance_after: i64,
        causal_reference: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: EntryId::generate(),
            account_id,
            delta: amount.abs(),
            reason: EntryReason::Refund,
            causal_reference: causal_reference.into(),
            balance_after,
            created_at: Utc::now(),
        }
    }
}

/// Why a ledger entry was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryReason {
    /// Credits deducted for an orchestration run.
    DebitAiOperation,

    /// Credits added from a completed purchase.
    CreditPurchase,

    /// Credits returned after a refund.
    Refund,
}

impl EntryReason {
    /// Check whether this reason adds credits.
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        matches!(self, Self::CreditPurchase | Self::Refund)
    }
}
