//! Provider invocation request and result types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ProviderId;

/// Context handed to every provider adapter for one orchestration run.
///
/// The `demo` flag is threaded through explicitly: demo accounts always
/// receive mocked output, so the behavior is deterministic and testable
/// without a special account or ambient global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Business name the content is for.
    pub business_name: String,

    /// Industry or category of the business.
    pub industry: String,

    /// Target audience name.
    pub audience_name: String,

    /// Free-form audience description.
    pub audience_description: String,

    /// What the caller wants to achieve (mission objective / topic).
    pub objective: String,

    /// When true, adapters must answer with deterministic mock data.
    pub demo: bool,
}

/// Outcome classification of one provider invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    /// Live call succeeded and the response validated.
    Ok,

    /// Deterministic mock data was used (unconfigured provider or demo
    /// account).
    Mocked,

    /// No response within the allotted timeout.
    Timeout,

    /// The call failed or the response failed structural validation.
    Error,
}

impl ProviderStatus {
    /// Check whether this status contributed usable content.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        matches!(self, Self::Ok | Self::Mocked)
    }
}

/// The normalized result of one provider invocation. Immutable once
/// produced; all adapter failure paths are represented here rather than
/// propagated, so the orchestration layer can always proceed with partial
/// data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResult {
    /// Which provider produced this result.
    pub provider: ProviderId,

    /// Outcome classification.
    pub status: ProviderStatus,

    /// Normalized structured content. Empty object for timeout/error.
    pub payload: serde_json::Value,

    /// How long the invocation took.
    #[serde(with = "duration_millis")]
    pub latency: Duration,

    /// Short diagnostic, set only for `Error` (and sometimes `Timeout`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl ProviderResult {
    /// Build an `Ok` result.
    #[must_use]
    pub fn ok(provider: ProviderId, payload: serde_json::Value, latency: Duration) -> Self {
        Self {
            provider,
            status: ProviderStatus::Ok,
            payload,
            latency,
            error_detail: None,
        }
    }

    /// Build a `Mocked` result.
    #[must_use]
    pub fn mocked(provider: ProviderId, payload: serde_json::Value, latency: Duration) -> Self {
        Self {
            provider,
            status: ProviderStatus::Mocked,
            payload,
            latency,
            error_detail: None,
        }
    }

    /// Build a `Timeout` result.
    #[must_use]
    pub fn timeout(provider: ProviderId, latency: Duration) -> Self {
        Self {
            provider,
            status: ProviderStatus::Timeout,
            payload: serde_json::Value::Object(serde_json::Map::new()),
            latency,
            error_detail: None,
        }
    }

    /// Build an `Error` result with a short diagnostic.
    #[must_use]
    pub fn error(provider: ProviderId, detail: impl Into<String>, latency: Duration) -> Self {
        Self {
            provider,
            status: ProviderStatus::Error,
            payload: serde_json::Value::Object(serde_json::Map::new()),
            latency,
            error_detail: Some(detail.into()),
        }
    }
}

/// Serialize a `Duration` as integer milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> ProviderId {
        ProviderId::new("openai").unwrap()
    }

    #[test]
    fn usable_statuses() {
        assert!(ProviderStatus::Ok.is_usable());
        assert!(ProviderStatus::Mocked.is_usable());
        assert!(!ProviderStatus::Timeout.is_usable());
        assert!(!ProviderStatus::Error.is_usable());
    }

    #[test]
    fn error_result_carries_detail() {
        let result = ProviderResult::error(provider(), "missing field: choices", Duration::ZERO);
        assert_eq!(result.status, ProviderStatus::Error);
        assert_eq!(result.error_detail.as_deref(), Some("missing field: choices"));
        assert!(result.payload.as_object().is_some_and(serde_json::Map::is_empty));
    }

    #[test]
    fn result_serde_roundtrip() {
        let result = ProviderResult::ok(
            provider(),
            serde_json::json!({"message": "hi"}),
            Duration::from_millis(420),
        );
        let json = serde_json::to_string(&result).unwrap();
        let parsed: ProviderResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.status, ProviderStatus::Ok);
        assert_eq!(parsed.latency, Duration::from_millis(420));
    }
}
