//! Inventory ledger: all-or-nothing capacity claims across ticket types.
//!
//! Each individual claim is atomic at the store layer, so two concurrent
//! requests for the last unit race correctly: exactly one succeeds. This
//! module adds the multi-line guarantee on top: either every selection in a
//! request is reserved, or none are; a failed line rolls back the lines
//! already taken.

use crate::error::{CoreError, CoreResult};
use crate::store::TicketTypeStore;
use crate::types::{TicketType, TicketTypeId};
use std::sync::Arc;

/// A single reserved line, used for compensation if the request later fails.
#[derive(Clone, Debug)]
pub struct Reservation {
    /// Ticket type the capacity was claimed from.
    pub ticket_type_id: TicketTypeId,
    /// Units claimed.
    pub quantity: u32,
}

/// Serializes capacity claims against the ticket-type store.
#[derive(Clone)]
pub struct InventoryLedger {
    ticket_types: Arc<dyn TicketTypeStore>,
}

impl InventoryLedger {
    /// Creates a ledger over a ticket-type store.
    #[must_use]
    pub fn new(ticket_types: Arc<dyn TicketTypeStore>) -> Self {
        Self { ticket_types }
    }

    /// Reserves every `(ticket_type, quantity)` pair or none of them.
    ///
    /// On the first failed claim, all claims already taken by this call are
    /// released before the error is returned, so no partial reservation is
    /// ever visible as committed capacity.
    ///
    /// # Errors
    ///
    /// [`CoreError::InsufficientInventory`] naming the offending ticket type
    /// when a claim loses the capacity race; [`CoreError::Storage`] on
    /// backend failure (also rolled back).
    pub async fn reserve_all(
        &self,
        selections: &[(TicketType, u32)],
    ) -> CoreResult<Vec<Reservation>> {
        let mut taken: Vec<Reservation> = Vec::with_capacity(selections.len());

        for (ticket, quantity) in selections {
            let claimed = match self.ticket_types.reserve(ticket.id, *quantity).await {
                Ok(claimed) => claimed,
                Err(err) => {
                    self.release_all(&taken).await;
                    return Err(err);
                }
            };

            if !claimed {
                self.release_all(&taken).await;
                // Re-read for an accurate availability figure in the error;
                // best effort, the reserve itself already failed atomically.
                let available = self
                    .ticket_types
                    .get(ticket.id)
                    .await
                    .ok()
                    .flatten()
                    .map_or(0, |current| current.available());
                return Err(CoreError::InsufficientInventory {
                    ticket_type_id: ticket.id,
                    ticket_name: ticket.name.clone(),
                    requested: *quantity,
                    available,
                });
            }

            taken.push(Reservation {
                ticket_type_id: ticket.id,
                quantity: *quantity,
            });
        }

        Ok(taken)
    }

    /// Releases a set of reservations (compensating decrement).
    ///
    /// Release failures are logged and swallowed: compensation must not mask
    /// the error that triggered it.
    pub async fn release_all(&self, reservations: &[Reservation]) {
        for reservation in reservations {
            if let Err(err) = self
                .ticket_types
                .release(reservation.ticket_type_id, reservation.quantity)
                .await
            {
                tracing::error!(
                    ticket_type_id = %reservation.ticket_type_id,
                    quantity = reservation.quantity,
                    error = %err,
                    "failed to release reservation"
                );
            }
        }
    }
}
