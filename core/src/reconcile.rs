//! Webhook reconciliation: applying a provider's asynchronous outcome to an
//! order exactly once.
//!
//! Deliveries are untrusted, may be duplicated, and may arrive concurrently
//! (provider retries). The pipeline is: verify the signature over the exact
//! raw bytes, resolve the order, then win (or lose) an atomic
//! compare-and-set to the terminal status. The `Paid` CAS also moves the
//! items to `Sold` in the same step; the remaining side effects (releasing
//! inventory, notification fan-out) run only on the delivery that won the
//! CAS, which makes reconciliation safe to run an unbounded number of
//! times for the same order and outcome.

use crate::error::{CoreError, CoreResult};
use crate::gateway::{GatewayRegistry, PaymentOutcome, WebhookEvent};
use crate::inventory::{InventoryLedger, Reservation};
use crate::metrics;
use crate::notify::{dispatch_order_notifications, Notifier};
use crate::store::Storage;
use crate::types::{Order, OrderId, OrderStatus, ProviderKind};
use std::sync::Arc;
use uuid::Uuid;

/// Acknowledgment returned to the webhook endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileAck {
    /// This delivery applied the terminal transition.
    Applied(PaymentOutcome),
    /// The order was already terminal; no-op.
    AlreadyFinal,
    /// The reference matched no order; logged and acknowledged so the
    /// provider stops retrying.
    Unmatched,
    /// Verified event type the engine does not act on.
    Ignored,
}

/// Consumes provider callbacks and reconciles order state.
#[derive(Clone)]
pub struct WebhookReconciler {
    storage: Storage,
    ledger: InventoryLedger,
    gateways: GatewayRegistry,
    notifier: Arc<dyn Notifier>,
}

impl WebhookReconciler {
    /// Creates a reconciler over the given storage and gateways.
    #[must_use]
    pub fn new(storage: Storage, gateways: GatewayRegistry, notifier: Arc<dyn Notifier>) -> Self {
        let ledger = InventoryLedger::new(storage.ticket_types.clone());
        Self {
            storage,
            ledger,
            gateways,
            notifier,
        }
    }

    /// Handles one webhook delivery.
    ///
    /// `raw_body` must be the exact unmodified bytes received; signatures
    /// are computed over the raw body, so any re-serialization breaks
    /// verification.
    ///
    /// # Errors
    ///
    /// [`CoreError::SignatureInvalid`] when verification fails (no state is
    /// touched and the caller must not reveal whether an order matched);
    /// [`CoreError::Validation`] for verified-but-malformed payloads;
    /// [`CoreError::Storage`] on backend failure.
    pub async fn handle(
        &self,
        provider: ProviderKind,
        raw_body: &[u8],
        signature: &str,
    ) -> CoreResult<ReconcileAck> {
        let gateway = self
            .gateways
            .get(provider)
            .ok_or(CoreError::ProviderUnconfigured(provider.as_str()))?;

        let event = gateway.verify_webhook(raw_body, signature).map_err(|err| {
            if matches!(err, CoreError::SignatureInvalid) {
                metrics::record_signature_failure(provider.as_str());
                tracing::warn!(provider = %provider, "webhook signature verification failed");
            }
            err
        })?;

        let Some(outcome) = event.outcome else {
            tracing::debug!(provider = %provider, reference = %event.reference, "ignoring webhook event type");
            return Ok(ReconcileAck::Ignored);
        };

        let Some(order) = self.resolve_order(&event).await? else {
            tracing::warn!(
                provider = %provider,
                reference = %event.reference,
                "webhook reference matched no order; acknowledging"
            );
            return Ok(ReconcileAck::Unmatched);
        };

        let target = match outcome {
            PaymentOutcome::Succeeded => OrderStatus::Paid,
            PaymentOutcome::Failed => OrderStatus::Failed,
        };

        // Atomic check-and-set: concurrent deliveries for the same order
        // cannot both believe they are first.
        if !self.storage.orders.begin_finalize(order.id, target).await? {
            tracing::info!(order_id = %order.id, status = %target, "order already terminal; webhook is a no-op");
            return Ok(ReconcileAck::AlreadyFinal);
        }

        match outcome {
            PaymentOutcome::Succeeded => self.apply_paid(&order).await?,
            PaymentOutcome::Failed => self.apply_failed(order.id).await?,
        }

        Ok(ReconcileAck::Applied(outcome))
    }

    /// Resolves the order behind a verified delivery.
    ///
    /// Lookup order: the persisted provider reference, then the order id the
    /// provider echoes back from initialization metadata, then the reference
    /// itself parsed as an order id. The metadata path matters for orders
    /// whose initialization timed out: the intent may still exist upstream,
    /// but no reference was ever persisted locally. When such an order is
    /// found, the reference is backfilled so later deliveries match directly.
    async fn resolve_order(&self, event: &WebhookEvent) -> CoreResult<Option<Order>> {
        if let Some(order) = self
            .storage
            .orders
            .find_by_reference(&event.reference)
            .await?
        {
            return Ok(Some(order));
        }

        let fallback_id = event.order_id.or_else(|| {
            Uuid::parse_str(&event.reference)
                .ok()
                .map(OrderId::from_uuid)
        });
        let Some(order_id) = fallback_id else {
            return Ok(None);
        };
        let Some(order) = self.storage.orders.get(order_id).await? else {
            return Ok(None);
        };
        if order.provider_reference.is_none() {
            self.storage
                .orders
                .set_provider_fields(order.id, &event.reference, order.checkout_url.as_deref())
                .await?;
        }
        Ok(Some(order))
    }

    /// Side effects of the first transition to `Paid`. The items already
    /// moved to `Sold` inside the finalize CAS itself; this is the metric
    /// and notification fan-out. Inventory is not touched; capacity was
    /// claimed at reservation time.
    async fn apply_paid(&self, order: &Order) -> CoreResult<()> {
        let items = self.storage.orders.items_for_order(order.id).await?;
        let ticket_count: u64 = items.iter().map(|item| u64::from(item.quantity)).sum();

        metrics::record_reconciled("paid");
        metrics::record_tickets_sold(ticket_count);
        tracing::info!(order_id = %order.id, tickets = ticket_count, "order reconciled as paid");

        dispatch_order_notifications(self.notifier.clone(), order.clone(), items);
        Ok(())
    }

    /// Transition to `Failed`: the reservation will never be consumed, so
    /// the claimed capacity goes back to the ledger.
    async fn apply_failed(&self, order_id: OrderId) -> CoreResult<()> {
        let items = self.storage.orders.items_for_order(order_id).await?;
        let reservations: Vec<Reservation> = items
            .iter()
            .map(|item| Reservation {
                ticket_type_id: item.ticket_type_id,
                quantity: item.quantity,
            })
            .collect();
        self.ledger.release_all(&reservations).await;

        metrics::record_reconciled("failed");
        tracing::info!(order_id = %order_id, "order reconciled as failed; inventory released");
        Ok(())
    }
}
