//! Order creation and lookup endpoints.

use crate::error::ApiError;
use crate::server::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use gatepass_core::error::CoreError;
use gatepass_core::orders::{AttendeeEntry, CreateOrderRequest, TicketSelection};
use gatepass_core::types::{Buyer, EventId, OrderId, TicketTypeId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for `POST /api/orders`.
#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    /// Event to buy tickets for.
    pub event_id: Uuid,
    /// Ticket selections.
    pub selections: Vec<SelectionBody>,
    /// Buyer contact.
    pub buyer: BuyerBody,
    /// Optional attendee roster.
    #[serde(default)]
    pub attendees: Vec<AttendeeBody>,
}

/// One ticket-type line.
#[derive(Debug, Deserialize)]
pub struct SelectionBody {
    /// Ticket type to purchase.
    pub ticket_type_id: Uuid,
    /// Number of tickets.
    pub quantity: u32,
}

/// Buyer contact fields.
#[derive(Debug, Deserialize)]
pub struct BuyerBody {
    /// Full name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Optional phone number.
    pub phone: Option<String>,
}

/// Attendee roster entry.
#[derive(Debug, Deserialize)]
pub struct AttendeeBody {
    /// Selection this entry belongs to.
    pub ticket_type_id: Uuid,
    /// Attendee name.
    pub name: Option<String>,
    /// Attendee email.
    pub email: Option<String>,
}

/// Response for order creation.
#[derive(Debug, Serialize)]
pub struct OrderCreatedResponse {
    /// Created order id.
    pub order_id: Uuid,
    /// Status after creation.
    pub status: String,
    /// Payment rail.
    pub provider: String,
    /// External payment reference, when initialized.
    pub reference: Option<String>,
    /// Hosted checkout URL, when the provider supplies one.
    pub checkout_url: Option<String>,
}

/// `POST /api/orders`
pub async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderBody>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let request = CreateOrderRequest {
        event_id: EventId::from_uuid(body.event_id),
        selections: body
            .selections
            .into_iter()
            .map(|selection| TicketSelection {
                ticket_type_id: TicketTypeId::from_uuid(selection.ticket_type_id),
                quantity: selection.quantity,
            })
            .collect(),
        buyer: Buyer {
            name: body.buyer.name,
            email: body.buyer.email,
            phone: body.buyer.phone,
        },
        attendees: body
            .attendees
            .into_iter()
            .map(|attendee| AttendeeEntry {
                ticket_type_id: TicketTypeId::from_uuid(attendee.ticket_type_id),
                name: attendee.name,
                email: attendee.email,
            })
            .collect(),
    };

    let receipt = state.orchestrator.create_order(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            order_id: *receipt.order_id.as_uuid(),
            status: receipt.status.as_str().to_string(),
            provider: receipt.provider.as_str().to_string(),
            reference: receipt.reference,
            checkout_url: receipt.checkout_url,
        }),
    ))
}

/// Order detail response.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// Order id.
    pub order_id: Uuid,
    /// Lifecycle status.
    pub status: String,
    /// Payment rail.
    pub provider: String,
    /// Order currency.
    pub currency: String,
    /// Order total in minor units.
    pub amount: u64,
    /// External payment reference.
    pub reference: Option<String>,
    /// Items on the order.
    pub items: Vec<OrderItemResponse>,
}

/// One line of an order.
#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    /// Item id.
    pub item_id: Uuid,
    /// Ticket type name at purchase time.
    pub ticket_name: String,
    /// Number of tickets on this line.
    pub quantity: u32,
    /// Ticket lifecycle status.
    pub status: String,
    /// Check-in token.
    pub ticket_token: String,
}

/// `GET /api/orders/:id`
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = OrderId::from_uuid(id);
    let order = state
        .storage
        .orders
        .get(order_id)
        .await?
        .ok_or_else(|| CoreError::not_found("order", order_id))?;
    let items = state.storage.orders.items_for_order(order_id).await?;

    Ok(Json(OrderResponse {
        order_id: *order.id.as_uuid(),
        status: order.status.as_str().to_string(),
        provider: order.provider.as_str().to_string(),
        currency: order.currency.as_str().to_string(),
        amount: order.amount.minor(),
        reference: order.provider_reference,
        items: items
            .into_iter()
            .map(|item| OrderItemResponse {
                item_id: *item.id.as_uuid(),
                ticket_name: item.ticket_name,
                quantity: item.quantity,
                status: item.status.as_str().to_string(),
                ticket_token: item.ticket_token,
            })
            .collect(),
    }))
}
