//! PayPal REST client.

mod client;

pub use client::PayPalClient;
