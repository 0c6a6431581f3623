//! Credit purchase endpoints.
//!
//! Purchases flow through the payment reconciler: `purchase` creates a
//! transaction and returns the processor approval URL, `execute` handles
//! the buyer's return, and `cancel` abandons a pending purchase. When
//! PayPal is not configured these endpoints answer 503.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use persuade_core::{RateTable, TransactionId, TransactionState};
use persuade_engine::PaymentReconciler;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

use super::Envelope;

fn reconciler(state: &AppState) -> Result<&Arc<PaymentReconciler>, ApiError> {
    state.reconciler.as_ref().ok_or(ApiError::PaymentsUnavailable)
}

/// One package as listed to buyers.
#[derive(Debug, Serialize)]
pub struct PackageView {
    /// Package id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Credits granted on completion.
    pub credits: i64,
    /// Base price in minor units.
    pub amount_minor: i64,
    /// Price including processor fees, in minor units.
    pub price_with_fees_minor: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Short description.
    pub description: String,
}

/// `GET /v1/payments/packages`
///
/// Public; listing packages requires no account.
pub async fn packages(
    State(state): State<Arc<AppState>>,
) -> Json<Envelope<Vec<PackageView>>> {
    let default_table;
    let table = match state.reconciler.as_ref() {
        Some(reconciler) => reconciler.rates(),
        None => {
            default_table = RateTable::default();
            &default_table
        }
    };

    let packages = table
        .packages
        .iter()
        .map(|p| PackageView {
            id: p.id.clone(),
            name: p.name.clone(),
            credits: p.credits,
            amount_minor: p.amount_minor,
            price_with_fees_minor: RateTable::price_with_fees(p.amount_minor),
            currency: p.currency.clone(),
            description: p.description.clone(),
        })
        .collect();

    Json(Envelope::ok(packages))
}

/// Request body for `POST /v1/payments/purchase`.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// Id of the package to buy.
    pub package_id: String,
}

/// A started purchase.
#[derive(Debug, Serialize)]
pub struct PurchaseView {
    /// Our transaction id.
    pub transaction_id: TransactionId,
    /// Transaction state.
    pub state: TransactionState,
    /// URL the buyer must visit to approve the payment.
    pub approval_url: String,
}

/// `POST /v1/payments/purchase`
pub async fn purchase(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(request): Json<PurchaseRequest>,
) -> Result<Json<Envelope<PurchaseView>>, ApiError> {
    let reconciler = reconciler(&state)?;
    let (transaction, approval_url) = reconciler
        .create(user.account_id, &request.package_id)
        .await?;

    Ok(Json(Envelope::ok(PurchaseView {
        transaction_id: transaction.transaction_id,
        state: transaction.state,
        approval_url,
    })))
}

/// Query parameters PayPal appends to the return redirect.
#[derive(Debug, Deserialize)]
pub struct ExecuteParams {
    /// Processor payment id.
    #[serde(rename = "paymentId")]
    pub payment_id: String,
    /// Approving payer id.
    #[serde(rename = "PayerID")]
    pub payer_id: String,
}

/// Final state of a purchase after execute/cancel.
#[derive(Debug, Serialize)]
pub struct TransactionView {
    /// Our transaction id.
    pub transaction_id: TransactionId,
    /// Transaction state.
    pub state: TransactionState,
    /// Credits the transaction grants.
    pub credits: i64,
}

/// `GET /v1/payments/execute`
///
/// Handles the buyer's return from PayPal. Idempotent: a repeat visit
/// reports the completed transaction without crediting again.
pub async fn execute(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(params): Query<ExecuteParams>,
) -> Result<Json<Envelope<TransactionView>>, ApiError> {
    let reconciler = reconciler(&state)?;
    let transaction = reconciler
        .execute(&params.payment_id, &params.payer_id)
        .await?;

    Ok(Json(Envelope::ok(TransactionView {
        transaction_id: transaction.transaction_id,
        state: transaction.state,
        credits: transaction.credits,
    })))
}

/// Query parameters for `GET /v1/payments/cancel`.
#[derive(Debug, Deserialize)]
pub struct CancelParams {
    /// Processor payment id.
    #[serde(rename = "paymentId")]
    pub payment_id: String,
}

/// `GET /v1/payments/cancel`
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(params): Query<CancelParams>,
) -> Result<Json<Envelope<TransactionView>>, ApiError> {
    let reconciler = reconciler(&state)?;
    let transaction = reconciler.cancel(&params.payment_id)?;

    Ok(Json(Envelope::ok_with_message(
        TransactionView {
            transaction_id: transaction.transaction_id,
            state: transaction.state,
            credits: transaction.credits,
        },
        "purchase cancelled",
    )))
}
