//! Service configuration.

use serde::Deserialize;
use std::path::Path;

use persuade_providers::ProviderCredentials;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/persuade").
    pub data_dir: String,

    /// HS256 secret for bearer token validation.
    pub auth_secret: Option<String>,

    /// PayPal API base URL (sandbox by default).
    pub paypal_api_base: String,

    /// PayPal client id (optional; payments disabled without it).
    pub paypal_client_id: Option<String>,

    /// PayPal client secret.
    pub paypal_client_secret: Option<String>,

    /// PayPal webhook signing secret.
    pub paypal_webhook_secret: Option<String>,

    /// Frontend URL for checkout redirects.
    pub frontend_url: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Default per-provider invocation timeout in milliseconds.
    pub provider_timeout_ms: u64,

    /// Upper bound on one orchestration run in milliseconds.
    pub session_timeout_ms: u64,

    /// Credits charged per requested provider in a session.
    pub cost_per_provider: i64,

    /// External provider API credentials.
    pub providers: ProviderCredentials,
}

/// PayPal secrets file structure.
#[derive(Debug, Deserialize)]
struct PayPalSecrets {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    webhook_secret: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let (paypal_client_id, paypal_client_secret, paypal_webhook_secret) = load_paypal_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/persuade".into()),
            auth_secret: std::env::var("AUTH_SECRET").ok(),
            paypal_api_base: std::env::var("PAYPAL_API_BASE")
                .unwrap_or_else(|_| "https://api.sandbox.paypal.com".into()),
            paypal_client_id,
            paypal_client_secret,
            paypal_webhook_secret,
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            provider_timeout_ms: std::env::var("PROVIDER_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30_000),
            session_timeout_ms: std::env::var("SESSION_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(45_000),
            cost_per_provider: std::env::var("COST_PER_PROVIDER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            providers: ProviderCredentials {
                openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
                perplexity_api_key: std::env::var("PERPLEXITY_API_KEY").ok(),
                claude_api_key: std::env::var("CLAUDE_API_KEY").ok(),
                gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
                audience_api_base: std::env::var("AUDIENCE_API_BASE").ok(),
                audience_api_key: std::env::var("AUDIENCE_API_KEY").ok(),
            },
        }
    }

    /// Whether PayPal is fully configured.
    #[must_use]
    pub fn has_paypal(&self) -> bool {
        self.paypal_client_id.is_some() && self.paypal_client_secret.is_some()
    }
}

/// Load PayPal secrets from file or environment.
fn load_paypal_secrets() -> (Option<String>, Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/paypal.json",
        "persuade/.secrets/paypal.json",
        "../.secrets/paypal.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<PayPalSecrets>(path) {
            tracing::info!(path = %path, "Loaded PayPal secrets from file");
            return (
                Some(secrets.client_id),
                Some(secrets.client_secret),
                secrets.webhook_secret,
            );
        }
    }

    tracing::debug!("PayPal secrets file not found, using environment variables");
    (
        std::env::var("PAYPAL_CLIENT_ID").ok(),
        std::env::var("PAYPAL_CLIENT_SECRET").ok(),
        std::env::var("PAYPAL_WEBHOOK_SECRET").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/persuade".into(),
            auth_secret: None,
            paypal_api_base: "https://api.sandbox.paypal.com".into(),
            paypal_client_id: None,
            paypal_client_secret: None,
            paypal_webhook_secret: None,
            frontend_url: "http://localhost:3000".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 60,
            provider_timeout_ms: 30_000,
            session_timeout_ms: 45_000,
            cost_per_provider: 1,
            providers: ProviderCredentials::default(),
        }
    }
}
