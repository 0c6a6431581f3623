//! PayPal REST API client.
//!
//! Implements the two calls the reconciler needs: creating a payment for
//! a purchase transaction and executing it after buyer approval. OAuth
//! access tokens are cached until shortly before expiry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use persuade_core::Transaction;
use persuade_engine::{CheckoutOrder, PaymentProcessor, ProcessorError};

use crate::config::ServiceConfig;

/// Tokens are refreshed this long before their stated expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(300);

/// Client for the PayPal REST API.
pub struct PayPalClient {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    return_url: String,
    cancel_url: String,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct PaymentResponse {
    id: String,
    #[serde(default)]
    links: Vec<PaymentLink>,
}

#[derive(Deserialize)]
struct PaymentLink {
    rel: String,
    href: String,
}

impl PayPalClient {
    /// Build a client from service configuration.
    ///
    /// Returns `None` when PayPal credentials are absent, in which case
    /// the service runs with payments disabled.
    #[must_use]
    pub fn from_config(config: &ServiceConfig) -> Option<Self> {
        let client_id = config.paypal_client_id.clone()?;
        let client_secret = config.paypal_client_secret.clone()?;
        Some(Self {
            client: reqwest::Client::new(),
            base_url: config.paypal_api_base.clone(),
            client_id,
            client_secret,
            return_url: format!("{}/payments/success", config.frontend_url),
            cancel_url: format!("{}/payments/cancel", config.frontend_url),
            token: Mutex::new(None),
        })
    }

    /// Get a valid access token, refreshing if the cached one is stale.
    ///
    /// The cache lock is never held across the token request; concurrent
    /// callers that both find a stale token each fetch a fresh one and the
    /// last write wins, which is harmless since every token is valid.
    async fn access_token(&self) -> Result<String, ProcessorError> {
        {
            let cached = self.token.lock().await;
            if let Some(token) = cached.as_ref() {
                if Instant::now() < token.expires_at {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", self.base_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| ProcessorError::new(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ProcessorError::new(format!(
                "token request returned {}",
                response.status()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProcessorError::new(format!("malformed token response: {e}")))?;

        let lifetime = Duration::from_secs(body.expires_in)
            .saturating_sub(TOKEN_EXPIRY_MARGIN);
        let mut cached = self.token.lock().await;
        *cached = Some(CachedToken {
            access_token: body.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(body.access_token)
    }

    /// Create a payment for the transaction and return its approval URL.
    async fn create_payment(
        &self,
        transaction: &Transaction,
    ) -> Result<CheckoutOrder, ProcessorError> {
        let token = self.access_token().await?;

        let body = json!({
            "intent": "sale",
            "payer": { "payment_method": "paypal" },
            "transactions": [{
                "amount": {
                    "total": format_amount(transaction.amount_minor),
                    "currency": transaction.currency,
                },
                "description": transaction.description,
                "custom": transaction.transaction_id.to_string(),
            }],
            "redirect_urls": {
                "return_url": self.return_url,
                "cancel_url": self.cancel_url,
            },
        });

        let response = self
            .client
            .post(format!("{}/v1/payments/payment", self.base_url))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProcessorError::new(format!("payment create failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ProcessorError::new(format!(
                "payment create returned {}",
                response.status()
            )));
        }

        let payment: PaymentResponse = response
            .json()
            .await
            .map_err(|e| ProcessorError::new(format!("malformed payment response: {e}")))?;

        let approval_url = payment
            .links
            .iter()
            .find(|l| l.rel == "approval_url")
            .map(|l| l.href.clone())
            .ok_or_else(|| ProcessorError::new("payment response missing approval_url"))?;

        Ok(CheckoutOrder {
            external_reference: payment.id,
            approval_url,
        })
    }

    /// Execute an approved payment.
    async fn execute_payment(
        &self,
        payment_id: &str,
        payer_id: &str,
    ) -> Result<(), ProcessorError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(format!(
                "{}/v1/payments/payment/{payment_id}/execute",
                self.base_url
            ))
            .bearer_auth(&token)
            .json(&json!({ "payer_id": payer_id }))
            .send()
            .await
            .map_err(|e| ProcessorError::new(format!("payment execute failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ProcessorError::new(format!(
                "payment execute returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl PaymentProcessor for PayPalClient {
    async fn create_order(
        &self,
        transaction: &Transaction,
    ) -> Result<CheckoutOrder, ProcessorError> {
        self.create_payment(transaction).await
    }

    async fn capture(
        &self,
        external_reference: &str,
        payer_reference: &str,
    ) -> Result<(), ProcessorError> {
        self.execute_payment(external_reference, payer_reference).await
    }
}

/// Render a minor-unit amount as a decimal string, e.g. `2999` -> `"29.99"`.
fn format_amount(amount_minor: i64) -> String {
    format!("{}.{:02}", amount_minor / 100, amount_minor % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use persuade_core::AccountId;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> PayPalClient {
        let config = ServiceConfig {
            paypal_api_base: server.uri(),
            paypal_client_id: Some("client-id".into()),
            paypal_client_secret: Some("client-secret".into()),
            frontend_url: "http://localhost:3000".into(),
            ..ServiceConfig::default()
        };
        PayPalClient::from_config(&config).unwrap()
    }

    fn token_mock() -> Mock {
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "test-token",
                "expires_in": 3600,
            })))
    }

    fn sample_transaction() -> Transaction {
        Transaction::new(
            AccountId::generate(),
            1000,
            2999,
            "USD".to_string(),
            "1000 credits".to_string(),
        )
    }

    #[test]
    fn amount_formatting() {
        assert_eq!(format_amount(2999), "29.99");
        assert_eq!(format_amount(1500), "15.00");
        assert_eq!(format_amount(5), "0.05");
    }

    #[tokio::test]
    async fn create_order_returns_approval_url() {
        let server = MockServer::start().await;
        token_mock().mount(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/payments/payment"))
            .and(body_string_contains("29.99"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "PAY-123",
                "links": [
                    { "rel": "self", "href": "https://paypal.test/self" },
                    { "rel": "approval_url", "href": "https://paypal.test/approve" },
                ],
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let order = client.create_order(&sample_transaction()).await.unwrap();
        assert_eq!(order.external_reference, "PAY-123");
        assert_eq!(order.approval_url, "https://paypal.test/approve");
    }

    #[tokio::test]
    async fn missing_approval_link_is_an_error() {
        let server = MockServer::start().await;
        token_mock().mount(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/payments/payment"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "PAY-123",
                "links": [],
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.create_order(&sample_transaction()).await.unwrap_err();
        assert!(err.to_string().contains("approval_url"));
    }

    #[tokio::test]
    async fn capture_posts_payer_id() {
        let server = MockServer::start().await;
        token_mock().mount(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/payments/payment/PAY-123/execute"))
            .and(body_string_contains("PAYER-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "PAY-123",
                "state": "approved",
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.capture("PAY-123", "PAYER-9").await.unwrap();
    }

    #[tokio::test]
    async fn token_is_cached_across_calls() {
        let server = MockServer::start().await;
        token_mock().expect(1).mount(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/payments/payment/PAY-1/execute"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.capture("PAY-1", "P").await.unwrap();
        client.capture("PAY-1", "P").await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_token_refreshes_do_not_serialize() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(500))
                    .set_body_json(serde_json::json!({
                        "access_token": "test-token",
                        "expires_in": 3600,
                    })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/payments/payment/PAY-1/execute"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let started = Instant::now();
        let (a, b) = tokio::join!(client.capture("PAY-1", "P"), client.capture("PAY-1", "P"));
        a.unwrap();
        b.unwrap();

        // Two refreshes behind a held lock would take at least a second.
        assert!(started.elapsed() < Duration::from_millis(900));
    }

    #[tokio::test]
    async fn processor_errors_surface_http_status() {
        let server = MockServer::start().await;
        token_mock().mount(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/payments/payment"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.create_order(&sample_transaction()).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
