//! Account endpoints.
//!
//! Account ids are issued at signup by the identity layer and arrive in
//! the bearer token; creating an account here materializes the credit
//! account for that id.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use persuade_core::{Account, AccountId};
use persuade_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

use super::Envelope;

/// Request body for `POST /v1/accounts`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateAccountRequest {
    /// Create a demo account; demo accounts only ever receive simulated
    /// provider output and are never billed.
    #[serde(default)]
    pub demo: bool,
}

/// Public view of an account.
#[derive(Debug, Serialize)]
pub struct AccountView {
    /// The account id.
    pub account_id: AccountId,
    /// Current credit balance.
    pub balance_credits: i64,
    /// Lifetime credits purchased.
    pub lifetime_purchased_credits: i64,
    /// Lifetime credits spent.
    pub lifetime_used_credits: i64,
    /// Demo flag.
    pub demo: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.account_id,
            balance_credits: account.balance_credits,
            lifetime_purchased_credits: account.lifetime_purchased_credits,
            lifetime_used_credits: account.lifetime_used_credits,
            demo: account.demo,
            created_at: account.created_at,
        }
    }
}

/// `POST /v1/accounts`
///
/// Creates the credit account for the authenticated user. Idempotent: if
/// the account already exists it is returned unchanged.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    body: Option<Json<CreateAccountRequest>>,
) -> Result<(StatusCode, Json<Envelope<AccountView>>), ApiError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();

    if let Some(existing) = state.store.get_account(&user.account_id)? {
        return Ok((StatusCode::OK, Json(Envelope::ok(AccountView::from(existing)))));
    }

    let account = if request.demo {
        Account::new_demo(user.account_id)
    } else {
        Account::new(user.account_id)
    };
    state.store.put_account(&account)?;

    tracing::info!(account = %user.account_id, demo = request.demo, "account created");

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(AccountView::from(account))),
    ))
}

/// `GET /v1/accounts/me`
pub async fn me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Envelope<AccountView>>, ApiError> {
    let account = state
        .store
        .get_account(&user.account_id)?
        .ok_or_else(|| ApiError::NotFound(format!("account not found: {}", user.account_id)))?;

    Ok(Json(Envelope::ok(AccountView::from(account))))
}
