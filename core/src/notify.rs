//! Notification fan-out.
//!
//! Notifications are a side effect of the authoritative order transition,
//! never part of it: dispatch happens on a detached task after the status
//! commit, and a sink failure is logged without failing the triggering
//! request. Exactly-once dispatch per paid order follows from the caller
//! only dispatching when it wins the terminal-status compare-and-set.

use crate::types::{Order, OrderItem};
use async_trait::async_trait;
use std::sync::Arc;

/// Notification category, used by sinks for routing/grouping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyCategory {
    /// Order confirmations to buyers.
    Orders,
    /// Ticket-ready notices to attendees.
    Tickets,
}

impl NotifyCategory {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Tickets => "tickets",
        }
    }
}

/// Outbound notification sink (email, push, in-app).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one notification. Best effort; the engine logs and moves on
    /// when this fails.
    ///
    /// # Errors
    ///
    /// Implementations may fail on transport problems; callers never
    /// propagate the failure into the order transaction.
    async fn push(
        &self,
        recipient: &str,
        title: &str,
        body: &str,
        category: NotifyCategory,
    ) -> Result<(), String>;
}

/// Dispatches the confirmation fan-out for a paid order on a detached task.
///
/// The buyer gets an order confirmation; each item with an attendee email
/// gets a ticket-ready notice.
pub fn dispatch_order_notifications(
    notifier: Arc<dyn Notifier>,
    order: Order,
    items: Vec<OrderItem>,
) {
    tokio::spawn(async move {
        let body = format!(
            "Order {} for event {} is confirmed.",
            order.id, order.event_id
        );
        if let Err(err) = notifier
            .push(
                &order.buyer.email,
                "Your order is confirmed",
                &body,
                NotifyCategory::Orders,
            )
            .await
        {
            tracing::warn!(order_id = %order.id, error = %err, "buyer notification failed");
        }

        for item in &items {
            let Some(attendee_email) = item.attendee_email() else {
                continue;
            };
            let body = format!(
                "Ticket {} for event {} is ready.",
                item.ticket_name, order.event_id
            );
            if let Err(err) = notifier
                .push(
                    attendee_email,
                    "Your ticket is ready",
                    &body,
                    NotifyCategory::Tickets,
                )
                .await
            {
                tracing::warn!(
                    order_id = %order.id,
                    item_id = %item.id,
                    error = %err,
                    "attendee notification failed"
                );
            }
        }
    });
}
