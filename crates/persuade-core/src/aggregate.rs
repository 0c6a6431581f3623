//! Aggregation of provider results into one response.

use serde::{Deserialize, Serialize};

use crate::{ProviderResult, ProviderStatus};

/// Overall outcome of one orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    /// Every result is `ok` or `mocked`.
    Full,

    /// At least one usable result and at least one timeout/error.
    Partial,

    /// Every result is a timeout or error.
    None,
}

/// The reconciled response for one orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResponse {
    /// Overall outcome classification.
    pub overall: OverallStatus,

    /// One result per requested provider, in the order the provider ids
    /// were supplied (stable, not completion order).
    pub results: Vec<ProviderResult>,

    /// True iff no result is a live `ok` — everything the caller sees is
    /// simulated. Surfaced so billing and UI can distinguish real from
    /// mock output.
    pub demo_mode: bool,

    /// Credits debited for this run (0 for total failure or demo mode).
    pub cost_credits: i64,
}

impl AggregatedResponse {
    /// Classify a sequence of results.
    ///
    /// `results` must be in request order; this function preserves it.
    #[must_use]
    pub fn from_results(results: Vec<ProviderResult>) -> Self {
        let usable = results.iter().filter(|r| r.status.is_usable()).count();
        let overall = if usable == results.len() && !results.is_empty() {
            OverallStatus::Full
        } else if usable > 0 {
            OverallStatus::Partial
        } else {
            OverallStatus::None
        };

        let demo_mode = !results.iter().any(|r| r.status == ProviderStatus::Ok);

        Self {
            overall,
            results,
            demo_mode,
            cost_credits: 0,
        }
    }

    /// Whether any usable content was produced.
    #[must_use]
    pub fn is_billable(&self) -> bool {
        self.overall != OverallStatus::None
    }
}
