//! Google Gemini adapter (strategy engine).
//!
//! Gemini authenticates with the key in the query string rather than a
//! header; the key is appended at request time and never logged.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};

use persuade_core::{ProviderId, ProviderRequest, ProviderResult};

use crate::{classify_transport_error, http_client, mock, prompt, ProviderAdapter};

/// Campaign-strategy adapter backed by the Gemini generateContent API.
pub struct GeminiAdapter {
    id: ProviderId,
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiAdapter {
    /// Default API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";

    const MODEL: &'static str = "gemini-pro";

    /// Create the adapter. Without a key it answers with mock data.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            id: crate::static_id("gemini"),
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
            "contents": [{
                "parts": [{ "text": prompt::strategy(request) }]
            }],
            "generationConfig": {
                "temperature": 0.7,
                "topK": 1,
                "topP": 1,
                "maxOutputTokens": 1000,
            },
        });

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            Self::MODEL
        );

        let response = match self
            .client
            .post(url)
            .query(&[("key", api_key)])
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

        let Some(strategy) = parsed
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
        else {
            return ProviderResult::error(
                self.id.clone(),
                "missing field: candidates[0].content.parts[0].text",
                started.elapsed(),
            );
        };

        let payload = json!({
            "strategy": strategy,
            "model": Self::MODEL,
            "source": "gemini",
        });

        ProviderResult::ok(self.id.clone(), payload, started.elapsed())
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn role(&self) -> &'static str {
        "campaign strategy"
    }

    async fn invoke(&self, request: &ProviderRequest, timeout: Duration) -> ProviderResult {
        let started = Instant::now();

        let api_key = if request.demo { None } else { self.api_key.as_deref() };
        let Some(api_key) = api_key else {
            return ProviderResult::mocked(self.id.clone(), mock::strategy(request), started.elapsed());
        };

        self.call_live(api_key, request, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persuade_core::ProviderStatus;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ProviderRequest {
        ProviderRequest {
            business_name: "Acme Coffee".into(),
            industry: "food_beverage".into(),
            audience_name: "remote workers".into(),
            audience_description: "laptop-bound professionals".into(),
            objective: "drive subscriptions".into(),
            demo: false,
        }
    }

    const TIMEOUT: Duration = Duration::from_millis(500);

    #[tokio::test]
    async fn live_call_puts_key_in_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-pro:generateContent"))
            .and(query_param("key", "g-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "Run a video campaign."}]}}],
            })))
            .mount(&server)
            .await;

        let adapter = GeminiAdapter::new(Some("g-test".into())).with_base_url(server.uri());
        let result = adapter.invoke(&request(), TIMEOUT).await;

        assert_eq!(result.status, ProviderStatus::Ok);
        assert_eq!(result.payload["strategy"], "Run a video campaign.");
        assert_eq!(result.payload["model"], "gemini-pro");
    }

    #[tokio::test]
    async fn missing_candidates_is_structural_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let adapter = GeminiAdapter::new(Some("g-test".into())).with_base_url(server.uri());
        let result = adapter.invoke(&request(), TIMEOUT).await;

        assert_eq!(result.status, ProviderStatus::Error);
        assert!(result
            .error_detail
            .as_deref()
            .unwrap()
            .contains("candidates[0]"));
    }

    #[tokio::test]
    async fn unconfigured_adapter_mocks() {
        let adapter = GeminiAdapter::new(None);
        let result = adapter.invoke(&request(), TIMEOUT).await;
        assert_eq!(result.status, ProviderStatus::Mocked);
        assert_eq!(result.payload, mock::strategy(&request()));
    }
}
