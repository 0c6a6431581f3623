//! OpenAI adapter (content engine).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};

use persuade_core::{ProviderId, ProviderRequest, ProviderResult};

use crate::{classify_transport_error, http_client, mock, prompt, ProviderAdapter};

/// Content-generation adapter backed by the OpenAI chat completions API.
pub struct OpenAiAdapter {
    id: ProviderId,
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiAdapter {
    /// Default API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com";

    const MODEL: &'static str = "gpt-4";

    /// Create the adapter. Without a key it answers with mock data.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            id: crate::static_id("openai"),
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
                    "content": "You are an expert in cognitive persuasion and marketing psychology."
                },
                { "role": "user", "content": prompt::content(request) }
            ],
            "max_tokens": 500,
            "temperature": 0.7,
        });

        let response = match self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
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

        let Some(content) = parsed
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
        else {
            return ProviderResult::error(
                self.id.clone(),
                "missing field: choices[0].message.content",
                started.elapsed(),
            );
        };

        // The model is asked for JSON; fall back to a plain message when
        // it answers with prose anyway.
        let content_value = match serde_json::from_str::<Value>(content) {
            Ok(value @ Value::Object(_)) => value,
            _ => json!({ "message": content }),
        };

        let payload = json!({
            "content": content_value,
            "usage": {
                "prompt_tokens": parsed.pointer("/usage/prompt_tokens").and_then(Value::as_u64).unwrap_or(0),
                "completion_tokens": parsed.pointer("/usage/completion_tokens").and_then(Value::as_u64).unwrap_or(0),
            },
            "source": "openai",
        });

        ProviderResult::ok(self.id.clone(), payload, started.elapsed())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn role(&self) -> &'static str {
        "content generation"
    }

    async fn invoke(&self, request: &ProviderRequest, timeout: Duration) -> ProviderResult {
        let started = Instant::now();

        let api_key = if request.demo { None } else { self.api_key.as_deref() };
        let Some(api_key) = api_key else {
            return ProviderResult::mocked(self.id.clone(), mock::content(request), started.elapsed());
        };

        self.call_live(api_key, request, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persuade_core::ProviderStatus;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(demo: bool) -> ProviderRequest {
        ProviderRequest {
            business_name: "Acme Coffee".into(),
            industry: "food_beverage".into(),
            audience_name: "remote workers".into(),
            audience_description: "laptop-bound professionals".into(),
            objective: "drive subscriptions".into(),
            demo,
        }
    }

    const TIMEOUT: Duration = Duration::from_millis(500);

    #[tokio::test]
    async fn unconfigured_adapter_mocks() {
        let adapter = OpenAiAdapter::new(None);
        let result = adapter.invoke(&request(false), TIMEOUT).await;
        assert_eq!(result.status, ProviderStatus::Mocked);
        assert_eq!(result.payload, mock::content(&request(false)));
    }

    #[tokio::test]
    async fn demo_request_mocks_despite_key() {
        let adapter = OpenAiAdapter::new(Some("sk-test".into()));
        let result = adapter.invoke(&request(true), TIMEOUT).await;
        assert_eq!(result.status, ProviderStatus::Mocked);
    }

    #[tokio::test]
    async fn live_call_parses_json_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "{\"headline\": \"Buy beans\"}"}}],
                "usage": {"prompt_tokens": 42, "completion_tokens": 7},
            })))
            .mount(&server)
            .await;

        let adapter = OpenAiAdapter::new(Some("sk-test".into())).with_base_url(server.uri());
        let result = adapter.invoke(&request(false), TIMEOUT).await;

        assert_eq!(result.status, ProviderStatus::Ok);
        assert_eq!(result.payload["content"]["headline"], "Buy beans");
        assert_eq!(result.payload["usage"]["prompt_tokens"], 42);
        assert_eq!(result.payload["source"], "openai");
    }

    #[tokio::test]
    async fn prose_content_wrapped_as_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "just some prose"}}],
            })))
            .mount(&server)
            .await;

        let adapter = OpenAiAdapter::new(Some("sk-test".into())).with_base_url(server.uri());
        let result = adapter.invoke(&request(false), TIMEOUT).await;

        assert_eq!(result.status, ProviderStatus::Ok);
        assert_eq!(result.payload["content"]["message"], "just some prose");
    }

    #[tokio::test]
    async fn missing_field_is_structural_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let adapter = OpenAiAdapter::new(Some("sk-test".into())).with_base_url(server.uri());
        let result = adapter.invoke(&request(false), TIMEOUT).await;

        assert_eq!(result.status, ProviderStatus::Error);
        assert!(result
            .error_detail
            .as_deref()
            .unwrap()
            .contains("choices[0].message.content"));
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let adapter = OpenAiAdapter::new(Some("sk-test".into())).with_base_url(server.uri());
        let result = adapter.invoke(&request(false), TIMEOUT).await;

        assert_eq!(result.status, ProviderStatus::Error);
        assert!(result.error_detail.as_deref().unwrap().contains("429"));
    }

    #[tokio::test]
    async fn slow_response_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(5))
                    .set_body_json(json!({})),
            )
            .mount(&server)
            .await;

        let adapter = OpenAiAdapter::new(Some("sk-test".into())).with_base_url(server.uri());
        let result = adapter
            .invoke(&request(false), Duration::from_millis(50))
            .await;

        assert_eq!(result.status, ProviderStatus::Timeout);
    }
}
