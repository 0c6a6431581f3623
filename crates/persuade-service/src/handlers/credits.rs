//! Credit balance and ledger history endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use persuade_core::LedgerEntry;
use persuade_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

use super::Envelope;

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 200;

/// Balance payload.
#[derive(Debug, Serialize)]
pub struct BalanceView {
    /// Current credit balance.
    pub balance_credits: i64,
    /// Lifetime credits purchased.
    pub lifetime_purchased_credits: i64,
    /// Lifetime credits spent.
    pub lifetime_used_credits: i64,
}

/// `GET /v1/credits/balance`
pub async fn balance(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Envelope<BalanceView>>, ApiError> {
    let account = state
        .store
        .get_account(&user.account_id)?
        .ok_or_else(|| ApiError::NotFound(format!("account not found: {}", user.account_id)))?;

    Ok(Json(Envelope::ok(BalanceView {
        balance_credits: account.balance_credits,
        lifetime_purchased_credits: account.lifetime_purchased_credits,
        lifetime_used_credits: account.lifetime_used_credits,
    })))
}

/// Pagination parameters for ledger history.
#[derive(Debug, Deserialize)]
pub struct EntriesParams {
    /// Page size (default 50, capped at 200).
    pub limit: Option<usize>,
    /// Entries to skip.
    pub offset: Option<usize>,
}

/// Ledger history payload.
#[derive(Debug, Serialize)]
pub struct EntriesView {
    /// Entries, newest first.
    pub entries: Vec<LedgerEntry>,
    /// Page size used.
    pub limit: usize,
    /// Offset used.
    pub offset: usize,
}

/// `GET /v1/credits/entries`
pub async fn entries(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<EntriesParams>,
) -> Result<Json<Envelope<EntriesView>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0);

    let entries = state.ledger.entries(&user.account_id, limit, offset)?;

    Ok(Json(Envelope::ok(EntriesView {
        entries,
        limit,
        offset,
    })))
}
