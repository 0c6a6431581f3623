//! `RocksDB` storage layer for the persuade service.
//!
//! This crate persists accounts, ledger entries, and payment transactions
//! using `RocksDB` with column families for indexing.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `accounts`: primary account records, keyed by `account_id`
//! - `entries`: ledger entries, keyed by `entry_id` (ULID)
//! - `entries_by_account`: index for listing entries per account
//! - `transactions`: payment transactions, keyed by `transaction_id`
//! - `transactions_by_external_ref`: processor reference lookup
//! - `causal_refs`: credit idempotency index
//!
//! # Atomicity
//!
//! Balance mutations are compound operations: the balance check, the
//! ledger entry append, and the account update commit in one write batch
//! under the store's write lock, so the balance and the entry list can
//! never disagree and two concurrent debits can never both succeed when
//! only one could be funded.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use persuade_core::{
    Account, AccountId, EntryId, EntryReason, LedgerEntry, Transaction, TransactionId,
    TransactionState,
};

/// The storage trait defining all database operations.
///
/// This abstracts the storage layer so the engine can be tested against
/// different implementations; the atomicity contracts documented on each
/// compound operation are part of the trait, not the backend.
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Insert or update an account record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_account(&self, account: &Account) -> Result<()>;

    /// Get an account by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>>;

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    /// Get a single ledger entry by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_entry(&self, entry_id: &EntryId) -> Result<Option<LedgerEntry>>;

    /// List ledger entries for an account, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_entries_by_account(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>>;

    /// Atomically debit an account: check funds, append one entry, update
    /// the balance. Returns the new balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::InsufficientCredits` if the balance can't fund the
    ///   debit; no mutation is performed.
    fn debit(
        &self,
        account_id: &AccountId,
        amount: i64,
        reason: EntryReason,
        causal_reference: &str,
    ) -> Result<i64>;

    /// Atomically credit an account: check the causal reference has not
    /// been applied before, append one entry, update the balance. Returns
    /// the new balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::DuplicateCausalReference` if a credit bearing this
    ///   causal reference already exists for the account; no mutation is
    ///   performed.
    fn credit(
        &self,
        account_id: &AccountId,
        amount: i64,
        reason: EntryReason,
        causal_reference: &str,
    ) -> Result<i64>;

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    /// Insert a payment transaction (and its external-reference index
    /// entry, if the reference is set).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_transaction(&self, transaction: &Transaction) -> Result<()>;

    /// Get a transaction by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>>;

    /// Find a transaction by its processor-assigned reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_transaction_by_external_ref(
        &self,
        external_reference: &str,
    ) -> Result<Option<Transaction>>;

    /// Atomically move a transaction to a new state, optionally recording
    /// the processor reference. Returns the updated transaction.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the transaction doesn't exist.
    /// - `StoreError::InvalidTransition` if the state machine forbids the
    ///   change; the transaction is left unchanged.
    fn transition_transaction(
        &self,
        transaction_id: &TransactionId,
        to: TransactionState,
        external_reference: Option<&str>,
    ) -> Result<Transaction>;

    /// Atomically complete a transaction and credit its account.
    ///
    /// The terminal-state check, the causal-reference check, the ledger
    /// credit, and the state change commit as one step, so concurrent or
    /// replayed completion events can never credit twice. Returns the new
    /// balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the transaction or account is missing.
    /// - `StoreError::DuplicateCausalReference` if the transaction is
    ///   already `Completed` (idempotent replay).
    /// - `StoreError::InvalidTransition` if the transaction is in any
    ///   other state that cannot reach `Completed`.
    fn complete_transaction(&self, transaction_id: &TransactionId) -> Result<i64>;
}
