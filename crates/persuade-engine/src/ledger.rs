//! Credit ledger façade.
//!
//! Thin typed wrapper over the store's atomic balance operations. The
//! expected business outcomes (not enough funds, replayed credit) come
//! back as enum variants; only real faults are errors.

use std::sync::Arc;

use persuade_core::{AccountId, EntryReason, LedgerEntry};
use persuade_store::{Store, StoreError};

use crate::error::{EngineError, Result};

/// Outcome of a debit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// The debit was applied.
    Applied {
        /// Balance after the debit.
        balance: i64,
    },

    /// The balance could not fund the debit; nothing changed.
    InsufficientFunds {
        /// Balance at the time of the attempt.
        balance: i64,
        /// Amount that was requested.
        required: i64,
    },
}

/// Outcome of a credit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditOutcome {
    /// The credit was applied.
    Applied {
        /// Balance after the credit.
        balance: i64,
    },

    /// A credit with the same causal reference was already applied;
    /// nothing changed.
    Duplicate,
}

/// Typed access to an account's credit balance and history.
#[derive(Clone)]
pub struct CreditLedger {
    store: Arc<dyn Store>,
}

impl CreditLedger {
    /// Create a ledger over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Current balance of an account.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::AccountNotFound` or a storage error.
    pub fn balance(&self, account_id: &AccountId) -> Result<i64> {
        let account = self
            .store
            .get_account(account_id)?
            .ok_or(EngineError::AccountNotFound(*account_id))?;
        Ok(account.balance_credits)
    }

    /// Atomically debit an account for an AI operation.
    ///
    /// # Errors
    ///
    /// Returns a storage error; insufficient funds is an outcome, not an
    /// error.
    pub fn debit(
        &self,
        account_id: &AccountId,
        amount: i64,
        causal_reference: &str,
    ) -> Result<DebitOutcome> {
        match self.store.debit(
            account_id,
            amount,
            EntryReason::DebitAiOperation,
            causal_reference,
        ) {
            Ok(balance) => Ok(DebitOutcome::Applied { balance }),
            Err(StoreError::InsufficientCredits { balance, required }) => {
                Ok(DebitOutcome::InsufficientFunds { balance, required })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Atomically credit an account, idempotent per causal reference.
    ///
    /// # Errors
    ///
    /// Returns a storage error; a replayed causal reference is an
    /// outcome, not an error.
    pub fn credit(
        &self,
        account_id: &AccountId,
        amount: i64,
        reason: EntryReason,
        causal_reference: &str,
    ) -> Result<CreditOutcome> {
        match self.store.credit(account_id, amount, reason, causal_reference) {
            Ok(balance) => Ok(CreditOutcome::Applied { balance }),
            Err(StoreError::DuplicateCausalReference { .. }) => Ok(CreditOutcome::Duplicate),
            Err(err) => Err(err.into()),
        }
    }

    /// Ledger history for an account, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn entries(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        Ok(self.store.list_entries_by_account(account_id, limit, offset)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persuade_core::Account;
    use persuade_store::RocksStore;
    use tempfile::TempDir;

    fn ledger_with_balance(balance: i64) -> (CreditLedger, AccountId, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let account_id = AccountId::generate();
        let mut account = Account::new(account_id);
        account.balance_credits = balance;
        store.put_account(&account).unwrap();
        (CreditLedger::new(store), account_id, dir)
    }

    #[test]
    fn debit_and_balance() {
        let (ledger, account_id, _dir) = ledger_with_balance(100);

        let outcome = ledger.debit(&account_id, 8, "session-1").unwrap();
        assert_eq!(outcome, DebitOutcome::Applied { balance: 92 });
        assert_eq!(ledger.balance(&account_id).unwrap(), 92);
    }

    #[test]
    fn insufficient_funds_is_an_outcome() {
        let (ledger, account_id, _dir) = ledger_with_balance(5);

        let outcome = ledger.debit(&account_id, 8, "session-1").unwrap();
        assert_eq!(
            outcome,
            DebitOutcome::InsufficientFunds {
                balance: 5,
                required: 8
            }
        );
        assert_eq!(ledger.balance(&account_id).unwrap(), 5);
    }

    #[test]
    fn replayed_credit_is_duplicate() {
        let (ledger, account_id, _dir) = ledger_with_balance(0);

        let first = ledger
            .credit(&account_id, 1000, EntryReason::CreditPurchase, "tx-1")
            .unwrap();
        assert_eq!(first, CreditOutcome::Applied { balance: 1000 });

        let replay = ledger
            .credit(&account_id, 1000, EntryReason::CreditPurchase, "tx-1")
            .unwrap();
        assert_eq!(replay, CreditOutcome::Duplicate);
        assert_eq!(ledger.balance(&account_id).unwrap(), 1000);
    }

    #[test]
    fn balance_matches_entry_sum() {
        let (ledger, account_id, _dir) = ledger_with_balance(0);

        ledger
            .credit(&account_id, 50, EntryReason::CreditPurchase, "tx-a")
            .unwrap();
        ledger.debit(&account_id, 12, "session-a").unwrap();
        ledger.debit(&account_id, 7, "session-b").unwrap();

        let entries = ledger.entries(&account_id, 10, 0).unwrap();
        let sum: i64 = entries.iter().map(|e| e.delta).sum();
        let balance = ledger.balance(&account_id).unwrap();

        assert_eq!(balance, sum);
        assert_eq!(entries[0].balance_after, balance);
    }

    #[test]
    fn missing_account_errors() {
        let (ledger, _account_id, _dir) = ledger_with_balance(0);
        let missing = AccountId::generate();
        assert!(matches!(
            ledger.balance(&missing),
            Err(EngineError::AccountNotFound(_))
        ));
    }
}
