//! Storage seams for the order engine.
//!
//! The engine mutates exactly three things: the claimed capacity counter on
//! ticket types, order terminal status, and order item status. Every mutation
//! that concurrency can race on is expressed as an atomic operation on the
//! trait, not a read-modify-write in the caller, so each backend can honor
//! the invariants with its own primitive (a conditional `UPDATE` in
//! Postgres, a serialized critical section in memory).

use crate::error::CoreResult;
use crate::types::{
    EventId, EventSummary, Order, OrderId, OrderItem, OrderItemId, OrderStatus, OrgRole,
    OrganizationId, PayoutAccount, TicketType, TicketTypeId, UserId,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Outcome of a check-in compare-and-set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckInAttempt {
    /// This call transitioned the item `Sold → CheckedIn`; carries the item
    /// as updated.
    CheckedIn(OrderItem),
    /// The token was already redeemed.
    AlreadyCheckedIn,
    /// The item is not in a redeemable state (unpaid, expired, refunded).
    NotEligible,
}

/// Ticket-type inventory access.
#[async_trait]
pub trait TicketTypeStore: Send + Sync {
    /// Loads a ticket type by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::Storage`] on backend failure.
    async fn get(&self, id: TicketTypeId) -> CoreResult<Option<TicketType>>;

    /// Lists ticket types for an event.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::Storage`] on backend failure.
    async fn list_for_event(&self, event_id: EventId) -> CoreResult<Vec<TicketType>>;

    /// Atomically claims `quantity` units of capacity.
    ///
    /// The availability check and the increment of `quantity_sold` happen as
    /// one indivisible operation. Returns `Ok(true)` when the claim
    /// succeeded, `Ok(false)` when capacity was insufficient or the ticket
    /// type is inactive.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::Storage`] on backend failure.
    async fn reserve(&self, id: TicketTypeId, quantity: u32) -> CoreResult<bool>;

    /// Compensating decrement for a reservation that will never be consumed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::Storage`] on backend failure.
    async fn release(&self, id: TicketTypeId, quantity: u32) -> CoreResult<()>;
}

/// Order and order-item persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists an order together with its items, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::Storage`] on backend failure; the
    /// caller must release any inventory reservations when this fails.
    async fn create(&self, order: &Order, items: &[OrderItem]) -> CoreResult<()>;

    /// Loads an order by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::Storage`] on backend failure.
    async fn get(&self, id: OrderId) -> CoreResult<Option<Order>>;

    /// Resolves an order by its external provider reference.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::Storage`] on backend failure.
    async fn find_by_reference(&self, reference: &str) -> CoreResult<Option<Order>>;

    /// Records the provider reference and checkout URL after payment
    /// initialization.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::Storage`] on backend failure.
    async fn set_provider_fields(
        &self,
        id: OrderId,
        reference: &str,
        checkout_url: Option<&str>,
    ) -> CoreResult<()>;

    /// Compare-and-set to a terminal status.
    ///
    /// Succeeds only from a non-terminal status (`Pending`,
    /// `RequiresAction`). Returns `Ok(true)` when this call made the
    /// transition; `Ok(false)` means another delivery got there first and
    /// side effects must not be reapplied.
    ///
    /// When `to` is `Paid`, every `Available` item of the order transitions
    /// to `Sold` in the same atomic step; an order can never be observed
    /// `Paid` with unsold items.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::Storage`] on backend failure.
    async fn begin_finalize(&self, id: OrderId, to: OrderStatus) -> CoreResult<bool>;

    /// Lists the items of an order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::Storage`] on backend failure.
    async fn items_for_order(&self, id: OrderId) -> CoreResult<Vec<OrderItem>>;

    /// Resolves an item by its opaque ticket token.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::Storage`] on backend failure.
    async fn find_item_by_token(&self, token: &str) -> CoreResult<Option<OrderItem>>;

    /// Compare-and-set `Sold → CheckedIn` on a single item. On success the
    /// updated item is returned; no follow-up read is needed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::Storage`] on backend failure.
    async fn check_in_item(&self, id: OrderItemId) -> CoreResult<CheckInAttempt>;
}

/// Event read model (read-only from the engine's perspective).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Loads an event summary.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::Storage`] on backend failure.
    async fn get(&self, id: EventId) -> CoreResult<Option<EventSummary>>;
}

/// Payout account read model.
#[async_trait]
pub trait PayoutAccountStore: Send + Sync {
    /// Returns the organization's default active payout account, if any.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::Storage`] on backend failure.
    async fn default_active_for(
        &self,
        organization_id: OrganizationId,
    ) -> CoreResult<Option<PayoutAccount>>;
}

/// Organization membership read model.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Returns the actor's role within an organization, if a member.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::Storage`] on backend failure.
    async fn role_in(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> CoreResult<Option<OrgRole>>;
}

/// Bundle of store handles shared by the services.
#[derive(Clone)]
pub struct Storage {
    /// Ticket-type inventory.
    pub ticket_types: Arc<dyn TicketTypeStore>,
    /// Orders and items.
    pub orders: Arc<dyn OrderStore>,
    /// Event read model.
    pub events: Arc<dyn EventStore>,
    /// Payout accounts.
    pub payout_accounts: Arc<dyn PayoutAccountStore>,
    /// Organization memberships.
    pub memberships: Arc<dyn MembershipStore>,
}
