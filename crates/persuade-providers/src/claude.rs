//! Anthropic Claude adapter (analysis engine).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};

use persuade_core::{ProviderId, ProviderRequest, ProviderResult};

use crate::{classify_transport_error, http_client, mock, prompt, ProviderAdapter};

/// Persuasion-analysis adapter backed by the Anthropic messages API.
pub struct ClaudeAdapter {
    id: ProviderId,
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl ClaudeAdapter {
    /// Default API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";

    const MODEL: &'static str = "claude-3-sonnet-20240229";
    const API_VERSION: &'static str = "2023-06-01";

    /// Create the adapter. Without a key it answers with mock data.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            id: crate::static_id("claude"),
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
            "max_tokens": 1000,
            "messages": [
                { "role": "user", "content": prompt::analysis(request) }
            ],
        });

        let response = match self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", Self::API_VERSION)
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

        let Some(analysis) = parsed.pointer("/content/0/text").and_then(Value::as_str) else {
            return ProviderResult::error(
                self.id.clone(),
                "missing field: content[0].text",
                started.elapsed(),
            );
        };

        let payload = json!({
            "analysis": analysis,
            "model": "claude-3-sonnet",
            "source": "claude",
        });

        ProviderResult::ok(self.id.clone(), payload, started.elapsed())
    }
}

#[async_trait]
impl ProviderAdapter for ClaudeAdapter {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn role(&self) -> &'static str {
        "persuasion analysis"
    }

    async fn invoke(&self, request: &ProviderRequest, timeout: Duration) -> ProviderResult {
        let started = Instant::now();

        let api_key = if request.demo { None } else { self.api_key.as_deref() };
        let Some(api_key) = api_key else {
            return ProviderResult::mocked(self.id.clone(), mock::analysis(request), started.elapsed());
        };

        self.call_live(api_key, request, timeout).await
    }
}
