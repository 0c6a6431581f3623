//! Provider adapters for the persuade service.
//!
//! Each adapter wraps one external engine behind the [`ProviderAdapter`]
//! trait: four AI engines (content, research, analysis, strategy) and one
//! audience-insight adapter per social platform.
//!
//! Adapters never propagate failures. Every outcome of an invocation,
//! including timeouts, transport errors, and structurally invalid
//! responses, is folded into a [`persuade_core::ProviderResult`] so the
//! orchestration layer can always assemble a response from whatever
//! arrived. An unconfigured adapter (no API key) and any request with the
//! demo flag set answer with deterministic mock data instead of calling
//! out.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod audience;
pub mod claude;
pub mod gemini;
pub mod mock;
pub mod openai;
pub mod perplexity;
mod prompt;

pub use audience::{AudienceAdapter, Platform};
pub use claude::ClaudeAdapter;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;
pub use perplexity::PerplexityAdapter;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use persuade_core::{ProviderId, ProviderRequest, ProviderResult};

/// One external engine behind a uniform invocation surface.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The id this adapter is registered under.
    fn id(&self) -> &ProviderId;

    /// Short human-readable role, for the adapter catalogue.
    fn role(&self) -> &'static str;

    /// Invoke the engine for one orchestration run.
    ///
    /// Infallible by contract: timeouts, transport failures, and invalid
    /// responses all come back as a classified `ProviderResult`.
    async fn invoke(&self, request: &ProviderRequest, timeout: Duration) -> ProviderResult;
}

/// Catalogue entry describing one registered adapter.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AdapterInfo {
    /// Adapter id.
    pub id: ProviderId,
    /// Short role description.
    pub role: &'static str,
}

/// Registry mapping provider ids to adapters.
///
/// Lookup of an unregistered id returns `None`; the orchestration layer
/// turns that into an error result rather than rejecting the whole run.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own id. Replaces any previous
    /// registration for the same id.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.id().clone(), adapter);
    }

    /// Look up an adapter by id.
    #[must_use]
    pub fn get(&self, id: &ProviderId) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(id).cloned()
    }

    /// Number of registered adapters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Catalogue of registered adapters, sorted by id.
    #[must_use]
    pub fn catalogue(&self) -> Vec<AdapterInfo> {
        let mut infos: Vec<_> = self
            .adapters
            .values()
            .map(|a| AdapterInfo {
                id: a.id().clone(),
                role: a.role(),
            })
            .collect();
        infos.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        infos
    }

    /// Build the standard registry: four AI engines plus one audience
    /// adapter per platform. Adapters whose key is absent stay registered
    /// and answer with mock data.
    #[must_use]
    pub fn standard(credentials: &ProviderCredentials) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(OpenAiAdapter::new(credentials.openai_api_key.clone())));
        registry.register(Arc::new(PerplexityAdapter::new(
            credentials.perplexity_api_key.clone(),
        )));
        registry.register(Arc::new(ClaudeAdapter::new(credentials.claude_api_key.clone())));
        registry.register(Arc::new(GeminiAdapter::new(credentials.gemini_api_key.clone())));
        for platform in Platform::ALL {
            registry.register(Arc::new(AudienceAdapter::new(
                platform,
                credentials.audience_api_base.clone(),
                credentials.audience_api_key.clone(),
            )));
        }
        registry
    }
}

/// API credentials for the standard adapter set. All optional; absence
/// leaves the corresponding adapter in mock mode.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    /// OpenAI API key (content engine).
    pub openai_api_key: Option<String>,
    /// Perplexity API key (research engine).
    pub perplexity_api_key: Option<String>,
    /// Anthropic API key (analysis engine).
    pub claude_api_key: Option<String>,
    /// Google AI API key (strategy engine).
    pub gemini_api_key: Option<String>,
    /// Base URL of the audience-insights hub.
    pub audience_api_base: Option<String>,
    /// API key for the audience-insights hub.
    pub audience_api_key: Option<String>,
}

/// Shared HTTP client construction for live adapters.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Build a `ProviderId` from a compile-time constant.
///
/// Only called with ids that satisfy the `ProviderId` rules, so the
/// validation cannot fail.
pub(crate) fn static_id(id: &'static str) -> ProviderId {
    #[allow(clippy::expect_used)]
    ProviderId::new(id).expect("static provider id is valid")
}

/// Classify a reqwest failure into a result for `provider`.
pub(crate) fn classify_transport_error(
    provider: &ProviderId,
    err: &reqwest::Error,
    latency: Duration,
) -> ProviderResult {
    if err.is_timeout() {
        ProviderResult::timeout(provider.clone(), latency)
    } else {
        ProviderResult::error(provider.clone(), err.to_string(), latency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_has_all_adapters() {
        let registry = AdapterRegistry::standard(&ProviderCredentials::default());
        assert_eq!(registry.len(), 8);

        for id in ["openai", "perplexity", "claude", "gemini", "twitter", "linkedin", "youtube", "reddit"] {
            let id = ProviderId::new(id).unwrap();
            assert!(registry.get(&id).is_some(), "missing adapter: {id}");
        }
    }

    #[test]
    fn catalogue_is_sorted() {
        let registry = AdapterRegistry::standard(&ProviderCredentials::default());
        let catalogue = registry.catalogue();
        let ids: Vec<_> = catalogue.iter().map(|i| i.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn unknown_id_lookup_is_none() {
        let registry = AdapterRegistry::standard(&ProviderCredentials::default());
        assert!(registry.get(&ProviderId::new("tiktok").unwrap()).is_none());
    }
}
