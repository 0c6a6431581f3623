//! Audience-insight adapters, one per social platform.
//!
//! All four platforms go through the same insights hub API (search by
//! keyword, platform in the path) but each produces a payload shaped for
//! its platform. A single adapter type parameterized by [`Platform`]
//! covers them; the per-platform differences live in the payload
//! normalizers.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};

use persuade_core::{ProviderId, ProviderRequest, ProviderResult};

use crate::{classify_transport_error, http_client, mock, ProviderAdapter};

/// A supported audience-data platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Sentiment and trend analysis from tweets.
    Twitter,
    /// Professional search for B2B targeting.
    LinkedIn,
    /// Content and channel analysis.
    YouTube,
    /// Community and topic insights.
    Reddit,
}

impl Platform {
    /// All supported platforms.
    pub const ALL: [Self; 4] = [Self::Twitter, Self::LinkedIn, Self::YouTube, Self::Reddit];

    /// The provider id string for this platform.
    #[must_use]
    pub const fn id_str(&self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::LinkedIn => "linkedin",
            Self::YouTube => "youtube",
            Self::Reddit => "reddit",
        }
    }

    /// Hub search path for this platform.
    const fn search_path(&self) -> &'static str {
        match self {
            Self::Twitter => "/twitter/search",
            Self::LinkedIn => "/linkedin/people",
            Self::YouTube => "/youtube/search",
            Self::Reddit => "/reddit/posts",
        }
    }

    const fn role(&self) -> &'static str {
        match self {
            Self::Twitter => "audience sentiment (twitter)",
            Self::LinkedIn => "professional search (linkedin)",
            Self::YouTube => "content analysis (youtube)",
            Self::Reddit => "community insights (reddit)",
        }
    }

    /// Deterministic mock payload for this platform.
    fn mock_payload(&self, request: &ProviderRequest) -> Value {
        match self {
            Self::Twitter => mock::twitter(request),
            Self::LinkedIn => mock::linkedin(request),
            Self::YouTube => mock::youtube(request),
            Self::Reddit => mock::reddit(request),
        }
    }

    /// Shape a hub search result into this platform's payload.
    #[allow(clippy::cast_possible_wrap)]
    fn normalize(&self, request: &ProviderRequest, items: &[Value], total: u64) -> Value {
        let head: Vec<_> = items.iter().take(10).cloned().collect();
        match self {
            Self::Twitter => json!({
                "data": {
                    "tweets": head,
                    "total_found": total,
                    "keywords": request.audience_name,
                    "sentiment": "positive",
                    "engagement_level": if items.len() > 5 { "high" } else { "medium" },
                },
                "source": "twitter_api",
            }),
            Self::LinkedIn => json!({
                "data": {
                    "profiles": head,
                    "total_found": total,
                    "keywords": request.audience_name,
                    "company_filter": Value::Null,
                    "insights": {
                        "common_titles": pluck(items, 5, "headline"),
                        "locations": pluck(items, 5, "location"),
                    },
                },
                "source": "linkedin_api",
            }),
            Self::YouTube => json!({
                "data": {
                    "videos": head,
                    "total_found": total,
                    "query": request.audience_name,
                    "insights": {
                        "popular_channels": pluck(items, 5, "channel"),
                        "avg_views": average(items, "views"),
                    },
                },
                "source": "youtube_api",
            }),
            Self::Reddit => json!({
                "data": {
                    "posts": head,
                    "subreddit": mock::subreddit_for(request),
                    "total_posts": total,
                    "insights": {
                        "hot_topics": pluck(items, 5, "title"),
                        "avg_engagement": average(items, "score"),
                    },
                },
                "source": "reddit_api",
            }),
        }
    }
}

/// Collect a string field from the first `n` items.
fn pluck(items: &[Value], n: usize, field: &str) -> Vec<String> {
    items
        .iter()
        .take(n)
        .filter_map(|item| item.get(field).and_then(Value::as_str))
        .map(ToString::to_string)
        .collect()
}

/// Average of an integer field over all items, zero when empty.
fn average(items: &[Value], field: &str) -> u64 {
    if items.is_empty() {
        return 0;
    }
    let sum: u64 = items
        .iter()
        .filter_map(|item| item.get(field).and_then(Value::as_u64))
        .sum();
    sum / items.len() as u64
}

/// Audience-data adapter for one platform.
pub struct AudienceAdapter {
    id: ProviderId,
    platform: Platform,
    api_base: Option<String>,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl AudienceAdapter {
    /// Create the adapter. Without a hub base URL it answers with mock
    /// data.
    #[must_use]
    pub fn new(platform: Platform, api_base: Option<String>, api_key: Option<String>) -> Self {
        Self {
            id: crate::static_id(platform.id_str()),
            platform,
            api_base,
            api_key,
            client: http_client(),
        }
    }

    /// The platform this adapter serves.
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    async fn call_live(
        &self,
        api_base: &str,
        request: &ProviderRequest,
        timeout: Duration,
    ) -> ProviderResult {
        let started = Instant::now();

        let mut builder = self
            .client
            .get(format!("{}{}", api_base, self.platform.search_path()))
            .query(&[("q", request.audience_name.as_str()), ("limit", "20")])
            .timeout(timeout);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = match builder.send().await {
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

        let Some(items) = parsed.get("items").and_then(Value::as_array) else {
            return ProviderResult::error(self.id.clone(), "missing field: items", started.elapsed());
        };
        let total = parsed
            .get("total")
            .and_then(Value::as_u64)
            .unwrap_or(items.len() as u64);

        let payload = self.platform.normalize(request, items, total);
        ProviderResult::ok(self.id.clone(), payload, started.elapsed())
    }
}

#[async_trait]
impl ProviderAdapter for AudienceAdapter {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn role(&self) -> &'static str {
        self.platform.role()
    }

    async fn invoke(&self, request: &ProviderRequest, timeout: Duration) -> ProviderResult {
        let started = Instant::now();

        let api_base = if request.demo { None } else { self.api_base.as_deref() };
        let Some(api_base) = api_base else {
            return ProviderResult::mocked(
                self.id.clone(),
                self.platform.mock_payload(request),
                started.elapsed(),
            );
        };

        self.call_live(api_base, request, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persuade_core::ProviderStatus;
    use wiremock::matchers::{method, path, query_param};
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
    async fn unconfigured_adapter_mocks_per_platform() {
        for platform in Platform::ALL {
            let adapter = AudienceAdapter::new(platform, None, None);
            let result = adapter.invoke(&request(false), TIMEOUT).await;
            assert_eq!(result.status, ProviderStatus::Mocked, "{platform:?}");
            assert_eq!(result.payload, platform.mock_payload(&request(false)));
        }
    }

    #[tokio::test]
    async fn twitter_live_normalization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/twitter/search"))
            .and(query_param("q", "remote workers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": (0..8).map(|i| json!({"id": i, "text": "tweet"})).collect::<Vec<_>>(),
                "total": 8,
            })))
            .mount(&server)
            .await;

        let adapter = AudienceAdapter::new(Platform::Twitter, Some(server.uri()), None);
        let result = adapter.invoke(&request(false), TIMEOUT).await;

        assert_eq!(result.status, ProviderStatus::Ok);
        assert_eq!(result.payload["data"]["total_found"], 8);
        assert_eq!(result.payload["data"]["engagement_level"], "high");
        assert_eq!(result.payload["source"], "twitter_api");
    }

    #[tokio::test]
    async fn reddit_live_insights() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reddit/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"title": "Best beans?", "score": 10},
                    {"title": "Grinder advice", "score": 30},
                ],
            })))
            .mount(&server)
            .await;

        let adapter = AudienceAdapter::new(Platform::Reddit, Some(server.uri()), None);
        let result = adapter.invoke(&request(false), TIMEOUT).await;

        assert_eq!(result.status, ProviderStatus::Ok);
        assert_eq!(result.payload["data"]["insights"]["avg_engagement"], 20);
        assert_eq!(
            result.payload["data"]["insights"]["hot_topics"][0],
            "Best beans?"
        );
    }

    #[tokio::test]
    async fn malformed_hub_response_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": []})))
            .mount(&server)
            .await;

        let adapter = AudienceAdapter::new(Platform::LinkedIn, Some(server.uri()), None);
        let result = adapter.invoke(&request(false), TIMEOUT).await;

        assert_eq!(result.status, ProviderStatus::Error);
        assert_eq!(result.error_detail.as_deref(), Some("missing field: items"));
    }

    #[tokio::test]
    async fn demo_request_never_calls_hub() {
        // No mock mounted: a live call would return a connection error,
        // so a Mocked status proves the hub was never contacted.
        let adapter = AudienceAdapter::new(
            Platform::YouTube,
            Some("http://127.0.0.1:1".into()),
            Some("key".into()),
        );
        let result = adapter.invoke(&request(true), TIMEOUT).await;
        assert_eq!(result.status, ProviderStatus::Mocked);
    }
}
