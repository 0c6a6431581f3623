//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use persuade_core::{
    Account, AccountId, EntryId, EntryReason, LedgerEntry, Transaction, TransactionId,
    TransactionState,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
///
/// Compound operations serialize through `write_lock` so the read-check-write
/// sequence inside each one is atomic with respect to every other mutation.
/// `RocksDB`'s write batch alone guarantees the writes land together, but not
/// that the balance read at the start is still current at commit time.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn load_account(&self, account_id: &AccountId) -> Result<Account> {
        self.get_account(account_id)?.ok_or_else(|| StoreError::NotFound {
            entity: "account",
            id: account_id.to_string(),
        })
    }

    fn load_transaction(&self, transaction_id: &TransactionId) -> Result<Transaction> {
        self.get_transaction(transaction_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "transaction",
                id: transaction_id.to_string(),
            })
    }

    fn has_causal_ref(&self, account_id: &AccountId, causal_reference: &str) -> Result<bool> {
        let cf = self.cf(cf::CAUSAL_REFS)?;
        let key = keys::causal_ref_key(account_id, causal_reference);

        let exists = self
            .db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();

        Ok(exists)
    }

    /// Stage an updated account and a new ledger entry into `batch`.
    fn stage_entry(&self, batch: &mut WriteBatch, account: &Account, entry: &LedgerEntry) -> Result<()> {
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_entries = self.cf(cf::ENTRIES)?;
        let cf_by_account = self.cf(cf::ENTRIES_BY_ACCOUNT)?;

        let account_key = keys::account_key(&account.account_id);
        let entry_key = keys::entry_key(&entry.entry_id);
        let index_key = keys::account_entry_key(&account.account_id, &entry.entry_id);

        batch.put_cf(&cf_accounts, &account_key, Self::serialize(account)?);
        batch.put_cf(&cf_entries, &entry_key, Self::serialize(entry)?);
        batch.put_cf(&cf_by_account, &index_key, []); // Index entry (empty value)

        Ok(())
    }

    /// Credit `account` under the write lock, as part of `batch`.
    ///
    /// Caller must hold `write_lock` and commit the batch.
    fn stage_credit(
        &self,
        batch: &mut WriteBatch,
        account: &mut Account,
        amount: i64,
        reason: EntryReason,
        causal_reference: &str,
    ) -> Result<i64> {
        if self.has_causal_ref(&account.account_id, causal_reference)? {
            return Err(StoreError::DuplicateCausalReference {
                causal_reference: causal_reference.to_string(),
            });
        }

        account.balance_credits += amount.abs();
        if reason == EntryReason::CreditPurchase {
            account.lifetime_purchased_credits += amount.abs();
        }
        account.updated_at = chrono::Utc::now();

        let entry = match reason {
            EntryReason::Refund => LedgerEntry::refund(
                account.account_id,
                amount,
                account.balance_credits,
                causal_reference,
            ),
            _ => LedgerEntry::credit_purchase(
                account.account_id,
                amount,
                account.balance_credits,
                causal_reference,
            ),
        };

        self.stage_entry(batch, account, &entry)?;

        let cf_causal = self.cf(cf::CAUSAL_REFS)?;
        let causal_key = keys::causal_ref_key(&account.account_id, causal_reference);
        batch.put_cf(&cf_causal, &causal_key, entry.entry_id.to_bytes());

        Ok(account.balance_credits)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    fn put_account(&self, account: &Account) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;

        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(&account.account_id);
        let value = Self::serialize(account)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(account_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    fn get_entry(&self, entry_id: &EntryId) -> Result<Option<LedgerEntry>> {
        let cf = self.cf(cf::ENTRIES)?;
        let key = keys::entry_key(entry_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_entries_by_account(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let cf_by_account = self.cf(cf::ENTRIES_BY_ACCOUNT)?;
        let cf_entries = self.cf(cf::ENTRIES)?;
        let prefix = keys::account_entries_prefix(account_id);

        let iter = self.db.iterator_cf(
            &cf_by_account,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        // Collect all matching keys first (ULIDs are naturally time-ordered)
        let mut all_keys: Vec<Vec<u8>> = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }

            all_keys.push(key.to_vec());
        }

        // Reverse to get newest first
        all_keys.reverse();

        let mut entries = Vec::new();
        for key in all_keys.into_iter().skip(offset) {
            if entries.len() >= limit {
                break;
            }

            let entry_id = keys::extract_entry_id_from_account_key(&key);
            let entry_key = keys::entry_key(&entry_id);
            if let Some(data) = self
                .db
                .get_cf(&cf_entries, entry_key)
                .map_err(|e| StoreError::Database(e.to_string()))?
            {
                entries.push(Self::deserialize(&data)?);
            }
        }

        Ok(entries)
    }

    fn debit(
        &self,
        account_id: &AccountId,
        amount: i64,
        reason: EntryReason,
        causal_reference: &str,
    ) -> Result<i64> {
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;

        let mut account = self.load_account(account_id)?;
        let amount = amount.abs();

        if !account.has_sufficient_credits(amount) {
            return Err(StoreError::InsufficientCredits {
                balance: account.balance_credits,
                required: amount,
            });
        }

        account.balance_credits -= amount;
        account.lifetime_used_credits += amount;
        account.updated_at = chrono::Utc::now();

        debug_assert_eq!(reason, EntryReason::DebitAiOperation);
        let entry = LedgerEntry::debit_ai_operation(
            account.account_id,
            amount,
            account.balance_credits,
            causal_reference,
        );

        let mut batch = WriteBatch::default();
        self.stage_entry(&mut batch, &account, &entry)?;
        self.write(batch)?;

        Ok(account.balance_credits)
    }

    fn credit(
        &self,
        account_id: &AccountId,
        amount: i64,
        reason: EntryReason,
        causal_reference: &str,
    ) -> Result<i64> {
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;

        let mut account = self.load_account(account_id)?;

        let mut batch = WriteBatch::default();
        let balance = self.stage_credit(&mut batch, &mut account, amount, reason, causal_reference)?;
        self.write(batch)?;

        Ok(balance)
    }

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    fn put_transaction(&self, transaction: &Transaction) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;

        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let tx_key = keys::transaction_key(&transaction.transaction_id);
        let value = Self::serialize(transaction)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_tx, &tx_key, &value);

        if let Some(external_reference) = &transaction.external_reference {
            let cf_by_ref = self.cf(cf::TRANSACTIONS_BY_EXTERNAL_REF)?;
            let ref_key = keys::external_ref_key(external_reference);
            batch.put_cf(&cf_by_ref, &ref_key, transaction.transaction_id.to_bytes());
        }

        self.write(batch)
    }

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>> {
        let cf = self.cf(cf::TRANSACTIONS)?;
        let key = keys::transaction_key(transaction_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn find_transaction_by_external_ref(
        &self,
        external_reference: &str,
    ) -> Result<Option<Transaction>> {
        let cf_by_ref = self.cf(cf::TRANSACTIONS_BY_EXTERNAL_REF)?;
        let ref_key = keys::external_ref_key(external_reference);

        let Some(id_bytes) = self
            .db
            .get_cf(&cf_by_ref, ref_key)
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let mut bytes = [0u8; 16];
        if id_bytes.len() != 16 {
            return Err(StoreError::Database(
                "malformed external reference index value".into(),
            ));
        }
        bytes.copy_from_slice(&id_bytes);
        let transaction_id = TransactionId::from_bytes(bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.get_transaction(&transaction_id)
    }

    fn transition_transaction(
        &self,
        transaction_id: &TransactionId,
        to: TransactionState,
        external_reference: Option<&str>,
    ) -> Result<Transaction> {
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;

        let mut transaction = self.load_transaction(transaction_id)?;

        if !transaction.state.can_transition(to) {
            return Err(StoreError::InvalidTransition {
                from: transaction.state,
                to,
            });
        }

        transaction.state = to;
        if let Some(external_reference) = external_reference {
            transaction.external_reference = Some(external_reference.to_string());
        }
        transaction.updated_at = chrono::Utc::now();

        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let tx_key = keys::transaction_key(transaction_id);
        let value = Self::serialize(&transaction)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_tx, &tx_key, &value);

        if let Some(external_reference) = &transaction.external_reference {
            let cf_by_ref = self.cf(cf::TRANSACTIONS_BY_EXTERNAL_REF)?;
            let ref_key = keys::external_ref_key(external_reference);
            batch.put_cf(&cf_by_ref, &ref_key, transaction.transaction_id.to_bytes());
        }

        self.write(batch)?;

        Ok(transaction)
    }

    fn complete_transaction(&self, transaction_id: &TransactionId) -> Result<i64> {
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;

        let mut transaction = self.load_transaction(transaction_id)?;

        // A replayed completion is reported as a duplicate so callers can
        // acknowledge it without crediting again.
        if transaction.state == TransactionState::Completed {
            return Err(StoreError::DuplicateCausalReference {
                causal_reference: transaction_id.to_string(),
            });
        }

        if !transaction.state.can_transition(TransactionState::Completed) {
            return Err(StoreError::InvalidTransition {
                from: transaction.state,
                to: TransactionState::Completed,
            });
        }

        let mut account = self.load_account(&transaction.account_id)?;

        let mut batch = WriteBatch::default();
        let balance = self.stage_credit(
            &mut batch,
            &mut account,
            transaction.credits,
            EntryReason::CreditPurchase,
            &transaction_id.to_string(),
        )?;

        transaction.state = TransactionState::Completed;
        transaction.updated_at = chrono::Utc::now();

        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let tx_key = keys::transaction_key(transaction_id);
        batch.put_cf(&cf_tx, &tx_key, Self::serialize(&transaction)?);

        self.write(batch)?;

        Ok(balance)
    }
}

fn poisoned() -> StoreError {
    StoreError::Database("write lock poisoned".into())
}
