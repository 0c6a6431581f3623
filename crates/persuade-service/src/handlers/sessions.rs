//! Orchestration session endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use persuade_core::{OverallStatus, ProviderId, ProviderRequest, ProviderResult};
use persuade_providers::AdapterInfo;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

use super::Envelope;

/// Request body for `POST /v1/sessions`.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// The business the content is for.
    pub business_name: String,
    /// Its industry.
    pub industry: String,
    /// Target audience name.
    pub audience_name: String,
    /// Target audience description.
    pub audience_description: String,
    /// Campaign objective.
    pub objective: String,
    /// Provider ids to invoke, in the order results should come back.
    pub providers: Vec<String>,
    /// Optional per-provider timeout override in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Force simulated output for this session.
    #[serde(default)]
    pub demo: bool,
}

/// One completed session.
#[derive(Debug, Serialize)]
pub struct SessionView {
    /// Session id; also the ledger reference for the session's debit.
    pub session_id: String,
    /// Overall outcome.
    pub overall: OverallStatus,
    /// Per-provider results, in request order.
    pub results: Vec<ProviderResult>,
    /// Credits debited for this session.
    pub cost_credits: i64,
    /// Account balance after the session.
    pub balance_credits: i64,
}

/// `POST /v1/sessions`
///
/// Runs one orchestration session across the requested providers and
/// settles its cost against the account.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<Envelope<SessionView>>, ApiError> {
    if request.providers.is_empty() {
        return Err(ApiError::BadRequest("providers must not be empty".into()));
    }

    let providers = request
        .providers
        .iter()
        .map(|id| {
            ProviderId::new(id)
                .map_err(|_| ApiError::BadRequest(format!("invalid provider id: {id:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let provider_request = ProviderRequest {
        business_name: request.business_name,
        industry: request.industry,
        audience_name: request.audience_name,
        audience_description: request.audience_description,
        objective: request.objective,
        demo: request.demo,
    };
    let per_call_timeout = request.timeout_ms.map(Duration::from_millis);

    let run = state
        .engine
        .run_billed(&user.account_id, &provider_request, &providers, per_call_timeout)
        .await?;

    let demo_mode = run.response.demo_mode;
    Ok(Json(Envelope::ok_with_demo(
        SessionView {
            session_id: run.session_id,
            overall: run.response.overall,
            results: run.response.results,
            cost_credits: run.response.cost_credits,
            balance_credits: run.balance,
        },
        demo_mode,
    )))
}

/// One provider in the catalogue.
#[derive(Debug, Serialize)]
pub struct ProviderView {
    /// Provider id, as accepted by session creation.
    pub id: String,
    /// Short role description.
    pub role: String,
}

impl From<AdapterInfo> for ProviderView {
    fn from(info: AdapterInfo) -> Self {
        Self {
            id: info.id.to_string(),
            role: info.role.to_string(),
        }
    }
}

/// `GET /v1/sessions/providers`
pub async fn providers(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Json<Envelope<Vec<ProviderView>>> {
    let catalogue = state
        .engine
        .registry()
        .catalogue()
        .into_iter()
        .map(ProviderView::from)
        .collect();

    Json(Envelope::ok(catalogue))
}
