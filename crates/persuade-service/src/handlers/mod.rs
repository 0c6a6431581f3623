//! HTTP request handlers.

pub mod accounts;
pub mod credits;
pub mod health;
pub mod payments;
pub mod sessions;
pub mod webhooks;

use serde::Serialize;

/// Standard success envelope for API responses.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    /// Always true; errors use the error response shape instead.
    pub success: bool,

    /// The response payload.
    pub data: T,

    /// Optional human-readable note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Set on responses where simulated output is possible, so clients can
    /// tell real results from demo results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_mode: Option<bool>,
}

impl<T> Envelope<T> {
    /// Wrap a payload in a success envelope.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
            demo_mode: None,
        }
    }

    /// Wrap a payload with a note.
    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    /// Wrap a payload and flag whether it contains simulated output.
    pub fn ok_with_demo(data: T, demo_mode: bool) -> Self {
        Self {
            demo_mode: Some(demo_mode),
            ..Self::ok(data)
        }
    }
}
