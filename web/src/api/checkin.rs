//! Gate check-in endpoint.

use crate::error::ApiError;
use crate::server::state::AppState;
use axum::extract::State;
use axum::Json;
use gatepass_core::types::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for `POST /api/orders/check-in`.
#[derive(Debug, Deserialize)]
pub struct CheckInBody {
    /// Staff member performing the scan.
    pub actor_id: Uuid,
    /// Token from the ticket QR code.
    pub ticket_token: String,
}

/// Check-in response.
#[derive(Debug, Serialize)]
pub struct CheckInResponse {
    /// Checked-in item.
    pub item_id: Uuid,
    /// Ticket type name.
    pub ticket_name: String,
    /// Status after the scan.
    pub status: String,
}

/// `POST /api/orders/check-in`
pub async fn check_in(
    State(state): State<AppState>,
    Json(body): Json<CheckInBody>,
) -> Result<Json<CheckInResponse>, ApiError> {
    let item = state
        .checkin
        .check_in(UserId::from_uuid(body.actor_id), &body.ticket_token)
        .await?;
    Ok(Json(CheckInResponse {
        item_id: *item.id.as_uuid(),
        ticket_name: item.ticket_name,
        status: item.status.as_str().to_string(),
    }))
}
