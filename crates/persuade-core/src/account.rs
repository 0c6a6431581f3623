//! Credit account types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AccountId;

/// A credit account for a user.
///
/// The balance is a whole number of credits and is never negative. Every
/// change to it is attributable to exactly one [`crate::LedgerEntry`];
/// lifetime counters are maintained redundantly for display and can be
/// checked against the entry sum to detect drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// The account id (issued at signup, outside this core).
    pub account_id: AccountId,

    /// Current credit balance.
    pub balance_credits: i64,

    /// Lifetime credits purchased.
    pub lifetime_purchased_credits: i64,

    /// Lifetime credits spent on AI operations.
    pub lifetime_used_credits: i64,

    /// Demo accounts always receive mocked provider output, regardless of
    /// which credentials are configured.
    pub demo: bool,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with zero balance.
    #[must_use]
    pub fn new(account_id: AccountId) -> Self {
        let now = Utc::now();
        Self {
            account_id,
            balance_credits: 0,
            lifetime_purchased_credits: 0,
            lifetime_used_credits: 0,
            demo: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a new demo account with zero balance.
    #[must_use]
    pub fn new_demo(account_id: AccountId) -> Self {
        let mut account = Self::new(account_id);
        account.demo = true;
        account
    }

    /// Check whether the account can fund a debit of `amount` credits.
    #[must_use]
    pub fn has_sufficient_credits(&self, amount: i64) -> bool {
        self.balance_credits >= amount
    }
}
