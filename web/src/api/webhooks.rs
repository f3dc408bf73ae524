//! Provider webhook endpoints.
//!
//! Both endpoints take the raw body bytes; the gateway verifies the
//! signature over exactly what was received. A missing or bad signature is
//! reported the same way, without revealing whether any order matched.

use crate::error::ApiError;
use crate::server::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use gatepass_core::error::CoreError;
use gatepass_core::gateway::PaymentOutcome;
use gatepass_core::types::ProviderKind;
use gatepass_core::ReconcileAck;
use serde::Serialize;

/// Webhook acknowledgment body.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Always `true`; the provider only needs a 2xx.
    pub received: bool,
    /// What the delivery did.
    pub result: &'static str,
}

fn ack_to_response(ack: ReconcileAck) -> WebhookResponse {
    let result = match ack {
        ReconcileAck::Applied(PaymentOutcome::Succeeded) => "applied_paid",
        ReconcileAck::Applied(PaymentOutcome::Failed) => "applied_failed",
        ReconcileAck::AlreadyFinal => "already_final",
        ReconcileAck::Unmatched => "unmatched",
        ReconcileAck::Ignored => "ignored",
    };
    WebhookResponse {
        received: true,
        result,
    }
}

fn signature_header(headers: &HeaderMap, name: &str) -> Result<String, ApiError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
        .ok_or(ApiError(CoreError::SignatureInvalid))
}

/// `POST /api/orders/webhook/stripe`
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let signature = signature_header(&headers, "stripe-signature")?;
    let ack = state
        .reconciler
        .handle(ProviderKind::Stripe, &body, &signature)
        .await?;
    Ok(Json(ack_to_response(ack)))
}

/// `POST /api/orders/webhook/paystack`
pub async fn paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let signature = signature_header(&headers, "x-paystack-signature")?;
    let ack = state
        .reconciler
        .handle(ProviderKind::Paystack, &body, &signature)
        .await?;
    Ok(Json(ack_to_response(ack)))
}
