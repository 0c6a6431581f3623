//! Key encoding utilities for `RocksDB`.

use persuade_core::{AccountId, EntryId, TransactionId};

/// Create an account key from an account id.
#[must_use]
pub fn account_key(account_id: &AccountId) -> Vec<u8> {
    account_id.as_bytes().to_vec()
}

/// Create an entry key from an entry id.
#[must_use]
pub fn entry_key(entry_id: &EntryId) -> Vec<u8> {
    entry_id.to_bytes().to_vec()
}

/// Create an account-entry index key.
///
/// Format: `account_id (16 bytes) || entry_id (16 bytes)`
///
/// Since ULIDs are time-ordered, entries for an account sort by time.
#[must_use]
pub fn account_entry_key(account_id: &AccountId, entry_id: &EntryId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(account_id.as_bytes());
    key.extend_from_slice(&entry_id.to_bytes());
    key
}

/// Create a prefix for iterating all entries for an account.
#[must_use]
pub fn account_entries_prefix(account_id: &AccountId) -> Vec<u8> {
    account_id.as_bytes().to_vec()
}

/// Extract the entry id from an account-entry index key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_entry_id_from_account_key(key: &[u8]) -> EntryId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    EntryId::from_bytes(bytes).expect("valid ULID bytes")
}

/// Create a transaction key from a transaction id.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Create an external-reference index key.
#[must_use]
pub fn external_ref_key(external_reference: &str) -> Vec<u8> {
    external_reference.as_bytes().to_vec()
}

/// Create a causal-reference idempotency key.
///
/// Format: `account_id (16 bytes) || causal_reference (utf-8)`
#[must_use]
pub fn causal_ref_key(account_id: &AccountId, causal_reference: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + causal_reference.len());
    key.extend_from_slice(account_id.as_bytes());
    key.extend_from_slice(causal_reference.as_bytes());
    key
}
