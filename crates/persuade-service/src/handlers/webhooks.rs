//! PayPal webhook endpoint.
//!
//! Deliveries are verified by HMAC signature, normalized into the
//! reconciler's event model, and always acknowledged with 200 once the
//! signature checks out. Replays, stale events, and unknown references
//! are logged, not errored, so PayPal stops redelivering.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use persuade_engine::{WebhookEvent, WebhookKind};

use crate::crypto::{constant_time_eq, hmac_sha256_hex};
use crate::error::ApiError;
use crate::state::AppState;

/// Signature header on PayPal webhook deliveries.
const SIGNATURE_HEADER: &str = "paypal-transmission-sig";

/// Acknowledgement body.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    /// Always true once the delivery is accepted.
    pub received: bool,
}

/// Raw webhook payload shape.
#[derive(Debug, Deserialize)]
struct WebhookPayload {
    event_type: String,
    #[serde(default)]
    resource: serde_json::Value,
}

/// `POST /webhooks/paypal`
pub async fn paypal_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    if let Some(secret) = state.config.paypal_webhook_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let expected = hmac_sha256_hex(secret, &body);
        if !constant_time_eq(signature, &expected) {
            tracing::warn!("webhook signature mismatch");
            return Err(ApiError::Unauthorized);
        }
    } else {
        tracing::debug!("no webhook secret configured, accepting delivery unverified");
    }

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("malformed webhook payload: {e}")))?;

    let Some(event) = normalize(&payload) else {
        tracing::debug!(event_type = %payload.event_type, "unhandled webhook event type");
        return Ok(Json(WebhookAck { received: true }));
    };

    let Some(reconciler) = state.reconciler.as_ref() else {
        tracing::warn!(
            event_type = %payload.event_type,
            "webhook received but payments are not configured"
        );
        return Ok(Json(WebhookAck { received: true }));
    };

    let outcome = reconciler.on_webhook(&event)?;
    tracing::info!(
        event_type = %payload.event_type,
        reference = %event.external_reference,
        outcome = ?outcome,
        "webhook applied"
    );

    Ok(Json(WebhookAck { received: true }))
}

/// Map a raw PayPal event to the reconciler's model.
///
/// Returns `None` for event types we do not act on, or when the payment
/// reference cannot be located in the payload.
fn normalize(payload: &WebhookPayload) -> Option<WebhookEvent> {
    let resource = &payload.resource;

    let (kind, reference) = match payload.event_type.as_str() {
        "CHECKOUT.ORDER.APPROVED" => (WebhookKind::Approved, resource_id(resource)?),
        // Capture events reference the capture, not the order; the order id
        // rides along in supplementary_data.
        "PAYMENT.CAPTURE.COMPLETED" => (
            WebhookKind::Completed,
            order_id_from_capture(resource).or_else(|| resource_id(resource))?,
        ),
        "CHECKOUT.ORDER.COMPLETED" => (WebhookKind::Completed, resource_id(resource)?),
        "PAYMENT.CAPTURE.DENIED" => (
            WebhookKind::Denied,
            order_id_from_capture(resource).or_else(|| resource_id(resource))?,
        ),
        "CHECKOUT.ORDER.CANCELLED" => (WebhookKind::Cancelled, resource_id(resource)?),
        _ => return None,
    };

    Some(WebhookEvent {
        external_reference: reference,
        kind,
    })
}

fn resource_id(resource: &serde_json::Value) -> Option<String> {
    resource.get("id").and_then(|v| v.as_str()).map(String::from)
}

fn order_id_from_capture(resource: &serde_json::Value) -> Option<String> {
    resource
        .get("supplementary_data")?
        .get("related_ids")?
        .get("order_id")?
        .as_str()
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(event_type: &str, resource: serde_json::Value) -> WebhookPayload {
        WebhookPayload {
            event_type: event_type.to_string(),
            resource,
        }
    }

    #[test]
    fn approval_uses_resource_id() {
        let event = normalize(&payload(
            "CHECKOUT.ORDER.APPROVED",
            json!({ "id": "PAY-1" }),
        ))
        .unwrap();
        assert_eq!(event.kind, WebhookKind::Approved);
        assert_eq!(event.external_reference, "PAY-1");
    }

    #[test]
    fn capture_completion_prefers_related_order_id() {
        let event = normalize(&payload(
            "PAYMENT.CAPTURE.COMPLETED",
            json!({
                "id": "CAP-9",
                "supplementary_data": { "related_ids": { "order_id": "PAY-1" } },
            }),
        ))
        .unwrap();
        assert_eq!(event.kind, WebhookKind::Completed);
        assert_eq!(event.external_reference, "PAY-1");
    }

    #[test]
    fn capture_completion_falls_back_to_resource_id() {
        let event = normalize(&payload(
            "PAYMENT.CAPTURE.COMPLETED",
            json!({ "id": "PAY-2" }),
        ))
        .unwrap();
        assert_eq!(event.external_reference, "PAY-2");
    }

    #[test]
    fn unknown_event_types_are_ignored() {
        assert!(normalize(&payload("BILLING.PLAN.CREATED", json!({ "id": "x" }))).is_none());
    }

    #[test]
    fn missing_reference_is_ignored() {
        assert!(normalize(&payload("CHECKOUT.ORDER.APPROVED", json!({}))).is_none());
    }
}
