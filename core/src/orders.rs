//! Order orchestration: from a buyer's ticket selection to a persisted order.
//!
//! The flow is `validate → reserve → persist → finalize-or-initialize`.
//! Inventory is claimed atomically per ticket type before the order is
//! persisted; any failure after a claim releases it (all-or-nothing).
//! Payment provider calls happen only after the order row is durable, so a
//! slow upstream never holds inventory hostage: a timed-out initialization
//! leaves the order `Pending` for webhook reconciliation to resolve, while a
//! definitive rejection rolls the reservation back and fails the order.

use crate::error::{CoreError, CoreResult};
use crate::fees;
use crate::gateway::{select_provider, GatewayRegistry, SplitInstruction};
use crate::inventory::InventoryLedger;
use crate::metrics;
use crate::notify::{dispatch_order_notifications, Notifier};
use crate::store::Storage;
use crate::types::{
    Attendee, Buyer, Currency, EventId, Money, Order, OrderId, OrderItem, OrderItemId,
    OrderStatus, ProviderKind, TicketStatus, TicketType, TicketTypeId,
};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// One line of a purchase request.
#[derive(Clone, Debug)]
pub struct TicketSelection {
    /// Ticket type to purchase.
    pub ticket_type_id: TicketTypeId,
    /// Number of tickets.
    pub quantity: u32,
}

/// Attendee roster entry, matched to a selection by ticket type.
#[derive(Clone, Debug)]
pub struct AttendeeEntry {
    /// Selection this entry belongs to.
    pub ticket_type_id: TicketTypeId,
    /// Attendee name, if collected.
    pub name: Option<String>,
    /// Attendee email, if collected.
    pub email: Option<String>,
}

/// A validated purchase request.
#[derive(Clone, Debug)]
pub struct CreateOrderRequest {
    /// Event to buy tickets for.
    pub event_id: EventId,
    /// Ticket selections; at least one, no duplicate ticket types.
    pub selections: Vec<TicketSelection>,
    /// Buyer contact.
    pub buyer: Buyer,
    /// Optional attendee roster. Entries beyond a selection's quantity are
    /// silently dropped (documented behavior, not an error).
    pub attendees: Vec<AttendeeEntry>,
}

/// What the buyer gets back from order creation.
#[derive(Clone, Debug)]
pub struct OrderReceipt {
    /// Created order.
    pub order_id: OrderId,
    /// Status after creation: `Paid` for free orders, `Pending` otherwise.
    pub status: OrderStatus,
    /// Rail the order settles through.
    pub provider: ProviderKind,
    /// External payment reference, absent for free orders and timed-out
    /// initializations.
    pub reference: Option<String>,
    /// Hosted checkout URL, when the provider supplies one.
    pub checkout_url: Option<String>,
}

/// Turns purchase requests into persisted orders.
#[derive(Clone)]
pub struct OrderOrchestrator {
    storage: Storage,
    ledger: InventoryLedger,
    gateways: GatewayRegistry,
    notifier: Arc<dyn Notifier>,
    platform_fee_percent: u8,
}

impl OrderOrchestrator {
    /// Creates an orchestrator over the given storage and gateways.
    #[must_use]
    pub fn new(
        storage: Storage,
        gateways: GatewayRegistry,
        notifier: Arc<dyn Notifier>,
        platform_fee_percent: u8,
    ) -> Self {
        let ledger = InventoryLedger::new(storage.ticket_types.clone());
        Self {
            storage,
            ledger,
            gateways,
            notifier,
            platform_fee_percent,
        }
    }

    /// Creates an order for the request.
    ///
    /// Free orders (zero total, or no paid line) are finalized immediately:
    /// persisted `Paid`, items marked `Sold`, notification fan-out
    /// dispatched. Paid orders are persisted `Pending` with the provider
    /// reference after payment initialization.
    ///
    /// # Errors
    ///
    /// See the crate error taxonomy; every failure path after a reservation
    /// releases the claimed inventory before returning.
    pub async fn create_order(&self, request: CreateOrderRequest) -> CoreResult<OrderReceipt> {
        Self::validate_request(&request)?;

        let event = self
            .storage
            .events
            .get(request.event_id)
            .await?
            .ok_or_else(|| CoreError::not_found("event", request.event_id))?;
        if !event.is_on_sale() {
            return Err(CoreError::validation("event is not published yet"));
        }

        let lines = self.load_lines(&request).await?;
        let currency = Self::single_currency(&lines)?;
        let total = lines
            .iter()
            .fold(Money::ZERO, |acc, (ticket, quantity)| {
                acc.saturating_add(ticket.price.saturating_mul(*quantity))
            });
        let any_paid_line = lines.iter().any(|(ticket, _)| ticket.is_paid);
        let is_free = !any_paid_line || total.is_zero();

        // Point of no return for inventory: from here on, every error path
        // must release these reservations.
        let reservations = self.ledger.reserve_all(&lines).await.inspect_err(|err| {
            if matches!(err, CoreError::InsufficientInventory { .. }) {
                metrics::record_oversell_rejection();
            }
        })?;

        let order_id = OrderId::new();
        let items = Self::build_items(order_id, &lines, &request.attendees);

        if is_free {
            return self
                .finalize_free_order(order_id, &event.id, request.buyer, currency, total, items)
                .await;
        }

        self.initialize_paid_order(
            order_id,
            &event,
            request.buyer,
            currency,
            total,
            items,
            &reservations,
        )
        .await
    }

    fn validate_request(request: &CreateOrderRequest) -> CoreResult<()> {
        if request.selections.is_empty() {
            return Err(CoreError::validation("at least one ticket selection is required"));
        }
        if request
            .selections
            .iter()
            .any(|selection| selection.quantity == 0)
        {
            return Err(CoreError::validation("quantity must be greater than zero"));
        }
        let mut seen = HashSet::new();
        if request
            .selections
            .iter()
            .any(|selection| !seen.insert(selection.ticket_type_id))
        {
            return Err(CoreError::validation("duplicate ticket type in selection"));
        }
        if request.buyer.name.trim().is_empty() {
            return Err(CoreError::validation("buyer name is required"));
        }
        if !request.buyer.email.contains('@') {
            return Err(CoreError::validation("buyer email is invalid"));
        }
        Ok(())
    }

    async fn load_lines(
        &self,
        request: &CreateOrderRequest,
    ) -> CoreResult<Vec<(TicketType, u32)>> {
        let now = Utc::now();
        let mut lines = Vec::with_capacity(request.selections.len());
        for selection in &request.selections {
            let ticket = self
                .storage
                .ticket_types
                .get(selection.ticket_type_id)
                .await?
                .ok_or_else(|| CoreError::not_found("ticket type", selection.ticket_type_id))?;
            if ticket.event_id != request.event_id {
                return Err(CoreError::validation("ticket does not belong to event"));
            }
            if !ticket.is_active {
                return Err(CoreError::validation(format!(
                    "ticket type {} is not on sale",
                    ticket.name
                )));
            }
            if !ticket.sales_window_open(now) {
                return Err(CoreError::validation(format!(
                    "sales window for {} is closed",
                    ticket.name
                )));
            }
            lines.push((ticket, selection.quantity));
        }
        Ok(lines)
    }

    fn single_currency(lines: &[(TicketType, u32)]) -> CoreResult<Currency> {
        let mut currencies = lines.iter().map(|(ticket, _)| &ticket.currency);
        let Some(first) = currencies.next() else {
            return Err(CoreError::validation("no ticket lines"));
        };
        if currencies.any(|currency| currency != first) {
            return Err(CoreError::validation(
                "all tickets in an order must use the same currency",
            ));
        }
        Ok(first.clone())
    }

    fn build_items(
        order_id: OrderId,
        lines: &[(TicketType, u32)],
        roster: &[AttendeeEntry],
    ) -> Vec<OrderItem> {
        lines
            .iter()
            .map(|(ticket, quantity)| {
                // Excess roster entries beyond the purchased quantity are
                // dropped here.
                let attendees: Vec<Attendee> = roster
                    .iter()
                    .filter(|entry| entry.ticket_type_id == ticket.id)
                    .take(*quantity as usize)
                    .map(|entry| Attendee {
                        name: entry.name.clone(),
                        email: entry.email.clone(),
                    })
                    .collect();
                OrderItem {
                    id: OrderItemId::new(),
                    order_id,
                    ticket_type_id: ticket.id,
                    ticket_name: ticket.name.clone(),
                    quantity: *quantity,
                    unit_price: ticket.price,
                    total: ticket.price.saturating_mul(*quantity),
                    status: TicketStatus::Available,
                    ticket_token: issue_ticket_token(ticket.id),
                    attendees,
                }
            })
            .collect()
    }

    async fn finalize_free_order(
        &self,
        order_id: OrderId,
        event_id: &EventId,
        buyer: Buyer,
        currency: Currency,
        total: Money,
        mut items: Vec<OrderItem>,
    ) -> CoreResult<OrderReceipt> {
        // A priced ticket type can still route here when no line `is_paid`;
        // the order amount must match the item totals either way.
        let order = Order {
            id: order_id,
            event_id: *event_id,
            buyer,
            status: OrderStatus::Paid,
            provider: ProviderKind::Free,
            provider_reference: None,
            checkout_url: None,
            currency,
            amount: total,
            platform_fee: Money::ZERO,
            organizer_take_home: total,
            payout_account_id: None,
            created_at: Utc::now(),
        };

        for item in &mut items {
            item.status = TicketStatus::Sold;
        }
        let ticket_count: u64 = items.iter().map(|item| u64::from(item.quantity)).sum();

        if let Err(err) = self.storage.orders.create(&order, &items).await {
            self.release_for_items(&items).await;
            return Err(err);
        }

        metrics::record_order_created("free");
        metrics::record_tickets_sold(ticket_count);
        tracing::info!(order_id = %order.id, event_id = %order.event_id, "free order finalized");
        dispatch_order_notifications(self.notifier.clone(), order, items);

        Ok(OrderReceipt {
            order_id,
            status: OrderStatus::Paid,
            provider: ProviderKind::Free,
            reference: None,
            checkout_url: None,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn initialize_paid_order(
        &self,
        order_id: OrderId,
        event: &crate::types::EventSummary,
        buyer: Buyer,
        currency: Currency,
        total: Money,
        items: Vec<OrderItem>,
        reservations: &[crate::inventory::Reservation],
    ) -> CoreResult<OrderReceipt> {
        let payout_lookup = self
            .storage
            .payout_accounts
            .default_active_for(event.organization_id)
            .await;
        let payout_lookup = match payout_lookup {
            Ok(found) => found,
            Err(err) => {
                self.ledger.release_all(reservations).await;
                return Err(err);
            }
        };
        let Some(payout_account) = payout_lookup else {
            self.ledger.release_all(reservations).await;
            return Err(CoreError::PayoutAccountMissing);
        };

        let provider = select_provider(event.country.as_deref());
        let Some(gateway) = self.gateways.get(provider).cloned() else {
            self.ledger.release_all(reservations).await;
            return Err(CoreError::ProviderUnconfigured(provider.as_str()));
        };

        let split = fees::split(total, self.platform_fee_percent);
        let order = Order {
            id: order_id,
            event_id: event.id,
            buyer,
            status: OrderStatus::Pending,
            provider,
            provider_reference: None,
            checkout_url: None,
            currency,
            amount: total,
            platform_fee: split.platform_fee,
            organizer_take_home: split.organizer_take_home,
            payout_account_id: Some(payout_account.id),
            created_at: Utc::now(),
        };

        if let Err(err) = self.storage.orders.create(&order, &items).await {
            self.ledger.release_all(reservations).await;
            return Err(err);
        }

        // The transactional boundary is closed; the provider call runs
        // outside it.
        let instruction = SplitInstruction {
            platform_fee: split.platform_fee,
            payout_account,
        };
        match gateway.initialize(&order, &instruction).await {
            Ok(init) => {
                self.storage
                    .orders
                    .set_provider_fields(order_id, &init.reference, init.checkout_url.as_deref())
                    .await?;
                metrics::record_order_created("paid");
                tracing::info!(
                    order_id = %order_id,
                    provider = %provider,
                    reference = %init.reference,
                    "payment initialized"
                );
                Ok(OrderReceipt {
                    order_id,
                    status: OrderStatus::Pending,
                    provider,
                    reference: Some(init.reference),
                    checkout_url: init.checkout_url,
                })
            }
            Err(CoreError::ProviderTimeout) => {
                // The provider may still process the intent; keep the order
                // pending and let reconciliation resolve it.
                metrics::record_order_created("paid");
                tracing::warn!(order_id = %order_id, provider = %provider, "payment initialization timed out; order left pending");
                Ok(OrderReceipt {
                    order_id,
                    status: OrderStatus::Pending,
                    provider,
                    reference: None,
                    checkout_url: None,
                })
            }
            Err(err) => {
                self.ledger.release_all(reservations).await;
                if self
                    .storage
                    .orders
                    .begin_finalize(order_id, OrderStatus::Failed)
                    .await
                    .is_err()
                {
                    tracing::error!(order_id = %order_id, "failed to mark order failed after provider rejection");
                }
                tracing::warn!(order_id = %order_id, provider = %provider, error = %err, "payment initialization rejected");
                Err(err)
            }
        }
    }

    async fn release_for_items(&self, items: &[OrderItem]) {
        let reservations: Vec<crate::inventory::Reservation> = items
            .iter()
            .map(|item| crate::inventory::Reservation {
                ticket_type_id: item.ticket_type_id,
                quantity: item.quantity,
            })
            .collect();
        self.ledger.release_all(&reservations).await;
    }
}

/// Issues an opaque check-in token for a ticket line.
fn issue_ticket_token(ticket_type_id: TicketTypeId) -> String {
    format!("{}:{}", ticket_type_id, Uuid::new_v4().simple())
}
