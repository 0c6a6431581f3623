//! Core types for the persuade service.
//!
//! This crate defines the domain model shared by the storage, provider,
//! orchestration, and HTTP layers:
//!
//! - Strongly-typed identifiers ([`AccountId`], [`TransactionId`],
//!   [`EntryId`], [`ProviderId`])
//! - The credit [`Account`] and append-only [`LedgerEntry`] records
//! - The payment [`Transaction`] state machine
//! - Provider invocation results and their aggregation
//! - The published [`RateTable`] mapping purchase amounts to credits

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod aggregate;
pub mod ids;
pub mod ledger;
pub mod provider;
pub mod rates;
pub mod transaction;

pub use account::Account;
pub use aggregate::{AggregatedResponse, OverallStatus};
pub use ids::{AccountId, EntryId, IdError, ProviderId, TransactionId};
pub use ledger::{EntryReason, LedgerEntry};
pub use provider::{ProviderRequest, ProviderResult, ProviderStatus};
pub use rates::{CreditPackage, RateTable};
pub use transaction::{Transaction, TransactionState};
