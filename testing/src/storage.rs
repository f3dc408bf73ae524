//! In-memory storage for tests and standalone runs.

use async_trait::async_trait;
use gatepass_core::error::{CoreError, CoreResult};
use gatepass_core::store::{
    CheckInAttempt, EventStore, MembershipStore, OrderStore, PayoutAccountStore, Storage,
    TicketTypeStore,
};
use gatepass_core::types::{
    EventId, EventSummary, Order, OrderId, OrderItem, OrderItemId, OrderStatus, OrgRole,
    OrganizationId, PayoutAccount, TicketStatus, TicketType, TicketTypeId, UserId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    events: HashMap<EventId, EventSummary>,
    ticket_types: HashMap<TicketTypeId, TicketType>,
    orders: HashMap<OrderId, Order>,
    items: HashMap<OrderItemId, OrderItem>,
    payout_accounts: Vec<PayoutAccount>,
    memberships: HashMap<(UserId, OrganizationId), OrgRole>,
}

/// In-memory storage backend.
///
/// Cloning is cheap and shares the underlying tables.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundles this backend into a [`Storage`] handle set.
    #[must_use]
    pub fn storage(&self) -> Storage {
        Storage {
            ticket_types: Arc::new(self.clone()),
            orders: Arc::new(self.clone()),
            events: Arc::new(self.clone()),
            payout_accounts: Arc::new(self.clone()),
            memberships: Arc::new(self.clone()),
        }
    }

    /// Seeds an event.
    pub async fn insert_event(&self, event: EventSummary) {
        self.tables.lock().await.events.insert(event.id, event);
    }

    /// Seeds a ticket type.
    pub async fn insert_ticket_type(&self, ticket: TicketType) {
        self.tables
            .lock()
            .await
            .ticket_types
            .insert(ticket.id, ticket);
    }

    /// Seeds a payout account.
    pub async fn insert_payout_account(&self, account: PayoutAccount) {
        self.tables.lock().await.payout_accounts.push(account);
    }

    /// Seeds an organization membership.
    pub async fn insert_membership(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
        role: OrgRole,
    ) {
        self.tables
            .lock()
            .await
            .memberships
            .insert((user_id, organization_id), role);
    }

    /// Snapshot of a ticket type, for assertions.
    pub async fn ticket_type(&self, id: TicketTypeId) -> Option<TicketType> {
        self.tables.lock().await.ticket_types.get(&id).cloned()
    }

    /// Snapshot of an order, for assertions.
    pub async fn order(&self, id: OrderId) -> Option<Order> {
        self.tables.lock().await.orders.get(&id).cloned()
    }

    /// Snapshot of an order's items, for assertions.
    pub async fn items_of(&self, order_id: OrderId) -> Vec<OrderItem> {
        self.tables
            .lock()
            .await
            .items
            .values()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TicketTypeStore for MemoryStorage {
    async fn get(&self, id: TicketTypeId) -> CoreResult<Option<TicketType>> {
        Ok(self.tables.lock().await.ticket_types.get(&id).cloned())
    }

    async fn list_for_event(&self, event_id: EventId) -> CoreResult<Vec<TicketType>> {
        Ok(self
            .tables
            .lock()
            .await
            .ticket_types
            .values()
            .filter(|ticket| ticket.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn reserve(&self, id: TicketTypeId, quantity: u32) -> CoreResult<bool> {
        // Check and increment under one lock hold: this is the atomic
        // check-and-reserve.
        let mut tables = self.tables.lock().await;
        let Some(ticket) = tables.ticket_types.get_mut(&id) else {
            return Ok(false);
        };
        if !ticket.is_active || ticket.quantity_sold.saturating_add(quantity) > ticket.quantity_total
        {
            return Ok(false);
        }
        ticket.quantity_sold += quantity;
        Ok(true)
    }

    async fn release(&self, id: TicketTypeId, quantity: u32) -> CoreResult<()> {
        let mut tables = self.tables.lock().await;
        if let Some(ticket) = tables.ticket_types.get_mut(&id) {
            ticket.quantity_sold = ticket.quantity_sold.saturating_sub(quantity);
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStorage {
    async fn create(&self, order: &Order, items: &[OrderItem]) -> CoreResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.orders.contains_key(&order.id) {
            return Err(CoreError::Storage(format!(
                "order {} already exists",
                order.id
            )));
        }
        tables.orders.insert(order.id, order.clone());
        for item in items {
            tables.items.insert(item.id, item.clone());
        }
        Ok(())
    }

    async fn get(&self, id: OrderId) -> CoreResult<Option<Order>> {
        Ok(self.tables.lock().await.orders.get(&id).cloned())
    }

    async fn find_by_reference(&self, reference: &str) -> CoreResult<Option<Order>> {
        Ok(self
            .tables
            .lock()
            .await
            .orders
            .values()
            .find(|order| order.provider_reference.as_deref() == Some(reference))
            .cloned())
    }

    async fn set_provider_fields(
        &self,
        id: OrderId,
        reference: &str,
        checkout_url: Option<&str>,
    ) -> CoreResult<()> {
        let mut tables = self.tables.lock().await;
        let order = tables
            .orders
            .get_mut(&id)
            .ok_or_else(|| CoreError::Storage(format!("order {id} not found")))?;
        order.provider_reference = Some(reference.to_string());
        order.checkout_url = checkout_url.map(ToString::to_string);
        Ok(())
    }

    async fn begin_finalize(&self, id: OrderId, to: OrderStatus) -> CoreResult<bool> {
        // One lock hold covers both the status CAS and the item updates;
        // the order is never observable `Paid` with unsold items.
        let mut tables = self.tables.lock().await;
        let order = tables
            .orders
            .get_mut(&id)
            .ok_or_else(|| CoreError::Storage(format!("order {id} not found")))?;
        if order.status.is_terminal() {
            return Ok(false);
        }
        order.status = to;
        if to == OrderStatus::Paid {
            for item in tables.items.values_mut() {
                if item.order_id == id && item.status == TicketStatus::Available {
                    item.status = TicketStatus::Sold;
                }
            }
        }
        Ok(true)
    }

    async fn items_for_order(&self, id: OrderId) -> CoreResult<Vec<OrderItem>> {
        Ok(self
            .tables
            .lock()
            .await
            .items
            .values()
            .filter(|item| item.order_id == id)
            .cloned()
            .collect())
    }

    async fn find_item_by_token(&self, token: &str) -> CoreResult<Option<OrderItem>> {
        Ok(self
            .tables
            .lock()
            .await
            .items
            .values()
            .find(|item| item.ticket_token == token)
            .cloned())
    }

    async fn check_in_item(&self, id: OrderItemId) -> CoreResult<CheckInAttempt> {
        let mut tables = self.tables.lock().await;
        let item = tables
            .items
            .get_mut(&id)
            .ok_or_else(|| CoreError::Storage(format!("order item {id} not found")))?;
        match item.status {
            TicketStatus::Sold => {
                item.status = TicketStatus::CheckedIn;
                Ok(CheckInAttempt::CheckedIn(item.clone()))
            }
            TicketStatus::CheckedIn => Ok(CheckInAttempt::AlreadyCheckedIn),
            TicketStatus::Available | TicketStatus::Expired | TicketStatus::Refunded => {
                Ok(CheckInAttempt::NotEligible)
            }
        }
    }
}

#[async_trait]
impl EventStore for MemoryStorage {
    async fn get(&self, id: EventId) -> CoreResult<Option<EventSummary>> {
        Ok(self.tables.lock().await.events.get(&id).cloned())
    }
}

#[async_trait]
impl PayoutAccountStore for MemoryStorage {
    async fn default_active_for(
        &self,
        organization_id: OrganizationId,
    ) -> CoreResult<Option<PayoutAccount>> {
        Ok(self
            .tables
            .lock()
            .await
            .payout_accounts
            .iter()
            .find(|account| {
                account.organization_id == organization_id
                    && account.is_default
                    && account.is_active
            })
            .cloned())
    }
}

#[async_trait]
impl MembershipStore for MemoryStorage {
    async fn role_in(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> CoreResult<Option<OrgRole>> {
        Ok(self
            .tables
            .lock()
            .await
            .memberships
            .get(&(user_id, organization_id))
            .copied())
    }
}
