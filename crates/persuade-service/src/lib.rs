//! Persuade HTTP API service.
//!
//! This crate provides the HTTP surface of the persuade system:
//!
//! - Account management and credit balance/history
//! - Orchestration sessions (multi-provider AI runs)
//! - Credit package purchases via PayPal
//! - PayPal webhooks
//!
//! # Authentication
//!
//! End-user requests carry a bearer token; webhook deliveries are
//! verified by HMAC signature instead.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Some handlers are async only for routing consistency

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod paypal;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use paypal::PayPalClient;
pub use routes::create_router;
pub use state::AppState;
