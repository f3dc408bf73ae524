//! Gate check-in: one-time redemption of a sold ticket.

use crate::error::{CoreError, CoreResult};
use crate::metrics;
use crate::store::{CheckInAttempt, Storage};
use crate::types::{OrderItem, UserId};

/// Validates presented ticket tokens and transitions them to checked-in.
#[derive(Clone)]
pub struct CheckInService {
    storage: Storage,
}

impl CheckInService {
    /// Creates a check-in service over the given storage.
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Checks in the ticket behind `token`, acting as `actor`.
    ///
    /// The actor must hold staff-level membership in the event's owning
    /// organization. A token already checked in is a reported conflict, not
    /// a silent success, so a shared or photographed QR code cannot admit
    /// twice.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] for unknown tokens, [`CoreError::Forbidden`]
    /// without staff membership, [`CoreError::AlreadyCheckedIn`] on
    /// re-presentation, [`CoreError::Validation`] for tickets that were
    /// never sold.
    pub async fn check_in(&self, actor: UserId, token: &str) -> CoreResult<OrderItem> {
        let item = self
            .storage
            .orders
            .find_item_by_token(token)
            .await?
            .ok_or_else(|| CoreError::not_found("ticket", token))?;
        let order = self
            .storage
            .orders
            .get(item.order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("order", item.order_id))?;
        let event = self
            .storage
            .events
            .get(order.event_id)
            .await?
            .ok_or_else(|| CoreError::not_found("event", order.event_id))?;

        let role = self
            .storage
            .memberships
            .role_in(actor, event.organization_id)
            .await?;
        if !role.is_some_and(|role| role.can_check_in()) {
            return Err(CoreError::Forbidden(
                "not allowed to check in attendees".to_string(),
            ));
        }

        match self.storage.orders.check_in_item(item.id).await? {
            CheckInAttempt::CheckedIn(updated) => {
                metrics::record_checkin();
                tracing::info!(item_id = %item.id, order_id = %order.id, "ticket checked in");
                Ok(updated)
            }
            CheckInAttempt::AlreadyCheckedIn => Err(CoreError::AlreadyCheckedIn),
            CheckInAttempt::NotEligible => Err(CoreError::validation(
                "ticket is not in a redeemable state",
            )),
        }
    }
}
