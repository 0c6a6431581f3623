//! Orchestration and billing engine for the persuade service.
//!
//! Three pieces live here:
//!
//! - [`orchestrator::OrchestrationEngine`] fans one request out to N
//!   provider adapters concurrently and settles the run's cost;
//! - [`ledger::CreditLedger`] is the typed façade over the store's atomic
//!   balance operations;
//! - [`reconciler::PaymentReconciler`] drives purchase transactions
//!   through their state machine and applies webhook deliveries
//!   idempotently.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod reconciler;

pub use error::{EngineError, ProcessorError, Result};
pub use ledger::{CreditLedger, CreditOutcome, DebitOutcome};
pub use orchestrator::{BilledRun, EngineConfig, OrchestrationEngine};
pub use reconciler::{
    CheckoutOrder, PaymentProcessor, PaymentReconciler, WebhookEvent, WebhookKind, WebhookOutcome,
};
