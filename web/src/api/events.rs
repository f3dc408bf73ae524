//! Ticket availability endpoint.

use crate::error::ApiError;
use crate::server::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use gatepass_core::error::CoreError;
use gatepass_core::types::EventId;
use serde::Serialize;
use uuid::Uuid;

/// One purchasable ticket type.
#[derive(Debug, Serialize)]
pub struct TicketTypeResponse {
    /// Ticket type id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Unit price in minor units.
    pub price: u64,
    /// Price currency.
    pub currency: String,
    /// Whether this category requires payment.
    pub is_paid: bool,
    /// Remaining unclaimed capacity.
    pub available: u32,
    /// Whether it can be purchased right now.
    pub on_sale: bool,
}

/// `GET /api/events/:id/ticket-types`
pub async fn list_ticket_types(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TicketTypeResponse>>, ApiError> {
    let event_id = EventId::from_uuid(id);
    state
        .storage
        .events
        .get(event_id)
        .await?
        .ok_or_else(|| CoreError::not_found("event", event_id))?;

    let now = chrono::Utc::now();
    let tickets = state.storage.ticket_types.list_for_event(event_id).await?;
    Ok(Json(
        tickets
            .into_iter()
            .map(|ticket| TicketTypeResponse {
                id: *ticket.id.as_uuid(),
                name: ticket.name.clone(),
                price: ticket.price.minor(),
                currency: ticket.currency.as_str().to_string(),
                is_paid: ticket.is_paid,
                available: ticket.available(),
                on_sale: ticket.is_active && ticket.sales_window_open(now),
            })
            .collect(),
    ))
}
