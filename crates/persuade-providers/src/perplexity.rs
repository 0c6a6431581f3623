//! Perplexity adapter (research engine).
//!
//! Same chat-completions wire shape as the content engine, but the
//! response additionally carries `citations` which are passed through to
//! the payload.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};

use persuade_core::{ProviderId, ProviderRequest, ProviderResult};

use crate::{classify_transport_error, http_client, mock, prompt, ProviderAdapter};

/// Research adapter backed by the Perplexity online model API.
pub struct PerplexityAdapter {
    id: ProviderId,
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl PerplexityAdapter {
    /// Default API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.perplexity.ai";

    const MODEL: &'static str = "llama-3.1-sonar-small-128k-online";

    /// Create the adapter. Without a key it answers with mock data.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            id: crate::static_id("perplexity"),
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            client: http_client(),
        }
    }

    /// Override the API base URL (tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn call_live(
        &self,
        api_key: &str,
        request: &ProviderRequest,
        timeout: Duration,
    ) -> ProviderResult {
        let started = Instant::now();
        let body = json!({
            "model": Self::MODEL,
            "messages": [
                {
                    "role": "system",
                    "content": "You are an expert market researcher and business analyst with access to current data."
                },
                { "role": "user", "content": prompt::research(request) }
            ],
            "max_tokens": 800,
            "temperature": 0.3,
        });

        let response = match self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .timeout(timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return classify_transport_error(&self.id, &err, started.elapsed()),
        };

        if !response.status().is_success() {
            let status = response.status();
            return ProviderResult::error(
                self.id.clone(),
                format!("unexpected status: {status}"),
                started.elapsed(),
            );
        }

        let parsed: Value = match response.json().await {
            Ok(parsed) => parsed,
            Err(err) => {
                return ProviderResult::error(self.id.clone(), err.to_string(), started.elapsed())
            }
        };

        let Some(research) = parsed
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
        else {
            return ProviderResult::error(
                self.id.clone(),
                "missing field: choices[0].message.content",
                started.elapsed(),
            );
        };

        let citations = parsed
            .get("citations")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));

        let payload = json!({
            "research": research,
            "citations": citations,
            "source": "perplexity",
        });

        ProviderResult::ok(self.id.clone(), payload, started.elapsed())
    }
}

#[async_trait]
impl ProviderAdapter for PerplexityAdapter {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn role(&self) -> &'static str {
        "market research"
    }

    async fn invoke(&self, request: &ProviderRequest, timeout: Duration) -> ProviderResult {
        let started = Instant::now();

        let api_key = if request.demo { None } else { self.api_key.as_deref() };
        let Some(api_key) = api_key else {
            return ProviderResult::mocked(self.id.clone(), mock::research(request), started.elapsed());
        };

        self.call_live(api_key, request, timeout).await
    }
}
