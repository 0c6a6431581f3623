//! Request authentication.
//!
//! End-user requests carry `Authorization: Bearer <jwt>` signed with the
//! configured HS256 secret. The claim `sub` holds the account id. In test
//! and local-dev deployments (no `auth_secret` configured) the literal
//! token form `test-token:<uuid>` is accepted instead.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

use persuade_core::AccountId;

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user extracted from the request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The authenticated account.
    pub account_id: AccountId,
}

/// JWT claims.
#[derive(Debug, Deserialize)]
struct JwtClaims {
    /// Subject: the account id.
    sub: String,
    /// Expiry (validated by jsonwebtoken).
    #[allow(dead_code)]
    exp: usize,
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        // Test-token path, only honoured when no signing secret is set.
        if state.config.auth_secret.is_none() {
            if let Some(raw) = token.strip_prefix("test-token:") {
                let account_id = raw.parse().map_err(|_| ApiError::Unauthorized)?;
                return Ok(Self { account_id });
            }
            return Err(ApiError::Unauthorized);
        }

        let secret = state
            .config
            .auth_secret
            .as_deref()
            .ok_or(ApiError::Unauthorized)?;

        let data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "JWT validation failed");
            ApiError::Unauthorized
        })?;

        let account_id = data
            .claims
            .sub
            .parse()
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(Self { account_id })
    }
}
