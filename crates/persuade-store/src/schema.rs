//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary account records, keyed by `account_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Ledger entries, keyed by `entry_id` (ULID).
    pub const ENTRIES: &str = "entries";

    /// Index: entries by account, keyed by `account_id || entry_id`.
    /// Value is empty (index only).
    pub const ENTRIES_BY_ACCOUNT: &str = "entries_by_account";

    /// Payment transactions, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: transactions by processor reference, keyed by the external
    /// reference string. Value is the transaction id bytes.
    pub const TRANSACTIONS_BY_EXTERNAL_REF: &str = "transactions_by_external_ref";

    /// Credit idempotency index, keyed by `account_id || causal_reference`.
    /// Value is the entry id bytes of the applied credit.
    pub const CAUSAL_REFS: &str = "causal_refs";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::ENTRIES,
        cf::ENTRIES_BY_ACCOUNT,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_EXTERNAL_REF,
        cf::CAUSAL_REFS,
    ]
}
