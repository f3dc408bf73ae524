//! End-to-end order engine scenarios over the in-memory backend.

#![allow(clippy::unwrap_used, clippy::panic)]

use gatepass_core::error::CoreError;
use gatepass_core::gateway::PaymentOutcome;
use gatepass_core::orders::{AttendeeEntry, CreateOrderRequest, TicketSelection};
use gatepass_core::store::OrderStore as _;
use gatepass_core::types::{
    Buyer, Currency, EventId, EventSummary, Money, OrderStatus, OrgRole, OrganizationId,
    PayoutAccount, PayoutAccountId, ProviderKind, TicketStatus, TicketType, TicketTypeId, UserId,
};
use gatepass_core::{
    CheckInService, GatewayRegistry, OrderOrchestrator, ReconcileAck, WebhookReconciler,
};
use gatepass_testing::{
    MemoryStorage, MockGateway, MockGatewayBehavior, RecordingNotifier, MOCK_WEBHOOK_SIGNATURE,
};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    storage: MemoryStorage,
    organization_id: OrganizationId,
    event_id: EventId,
    gateway: MockGateway,
    notifier: Arc<RecordingNotifier>,
    orchestrator: OrderOrchestrator,
    reconciler: WebhookReconciler,
    checkin: CheckInService,
}

impl Harness {
    async fn new() -> Self {
        let storage = MemoryStorage::new();
        let organization_id = OrganizationId::new();
        let event_id = EventId::new();
        storage
            .insert_event(EventSummary {
                id: event_id,
                organization_id,
                name: "Lagos Tech Fest".to_string(),
                country: Some("Nigeria".to_string()),
                is_published: true,
                is_approved: true,
            })
            .await;

        let gateway = MockGateway::new(ProviderKind::Paystack);
        let registry = GatewayRegistry::new().with(Arc::new(gateway.clone()));
        let notifier = Arc::new(RecordingNotifier::new());
        let bundle = storage.storage();
        Self {
            orchestrator: OrderOrchestrator::new(
                bundle.clone(),
                registry.clone(),
                notifier.clone(),
                10,
            ),
            reconciler: WebhookReconciler::new(bundle.clone(), registry, notifier.clone()),
            checkin: CheckInService::new(bundle),
            storage,
            organization_id,
            event_id,
            gateway,
            notifier,
        }
    }

    async fn seed_ticket_type(&self, name: &str, price: u64, capacity: u32) -> TicketTypeId {
        let id = TicketTypeId::new();
        self.storage
            .insert_ticket_type(TicketType {
                id,
                event_id: self.event_id,
                name: name.to_string(),
                price: Money::from_minor(price),
                currency: Currency::new("NGN"),
                is_paid: price > 0,
                quantity_total: capacity,
                quantity_sold: 0,
                sales_start: None,
                sales_end: None,
                is_active: true,
            })
            .await;
        id
    }

    async fn seed_payout_account(&self) {
        self.storage
            .insert_payout_account(PayoutAccount {
                id: PayoutAccountId::new(),
                organization_id: self.organization_id,
                provider: ProviderKind::Paystack,
                provider_account_code: "ACCT_test".to_string(),
                is_default: true,
                is_active: true,
            })
            .await;
    }

    fn request(&self, selections: Vec<TicketSelection>) -> CreateOrderRequest {
        CreateOrderRequest {
            event_id: self.event_id,
            selections,
            buyer: Buyer {
                name: "Ada Obi".to_string(),
                email: "ada@example.com".to_string(),
                phone: None,
            },
            attendees: Vec::new(),
        }
    }
}

async fn settle_background_tasks() {
    // Notification fan-out runs on detached tasks.
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn free_order_is_finalized_immediately() {
    let h = Harness::new().await;
    let ticket = h.seed_ticket_type("Community", 0, 50).await;

    let receipt = h
        .orchestrator
        .create_order(h.request(vec![TicketSelection {
            ticket_type_id: ticket,
            quantity: 2,
        }]))
        .await
        .unwrap();

    assert_eq!(receipt.status, OrderStatus::Paid);
    assert_eq!(receipt.provider, ProviderKind::Free);
    assert!(receipt.reference.is_none());

    let order = h.storage.order(receipt.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.amount, Money::ZERO);

    let items = h.storage.items_of(receipt.order_id).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].status, TicketStatus::Sold);

    assert_eq!(h.storage.ticket_type(ticket).await.unwrap().quantity_sold, 2);

    settle_background_tasks().await;
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "ada@example.com");
}

#[tokio::test]
async fn priced_but_unpaid_lines_keep_the_order_amount() {
    let h = Harness::new().await;
    // A priced ticket type that is not flagged as paid (comped allocation)
    // routes through the free path but still carries its monetary value.
    let ticket = TicketTypeId::new();
    h.storage
        .insert_ticket_type(TicketType {
            id: ticket,
            event_id: h.event_id,
            name: "Comp".to_string(),
            price: Money::from_minor(5000),
            currency: Currency::new("NGN"),
            is_paid: false,
            quantity_total: 10,
            quantity_sold: 0,
            sales_start: None,
            sales_end: None,
            is_active: true,
        })
        .await;

    let receipt = h
        .orchestrator
        .create_order(h.request(vec![TicketSelection {
            ticket_type_id: ticket,
            quantity: 1,
        }]))
        .await
        .unwrap();

    assert_eq!(receipt.status, OrderStatus::Paid);
    assert_eq!(receipt.provider, ProviderKind::Free);

    let order = h.storage.order(receipt.order_id).await.unwrap();
    let items = h.storage.items_of(receipt.order_id).await;
    let item_total = items
        .iter()
        .fold(Money::ZERO, |acc, item| acc.saturating_add(item.total));
    assert_eq!(order.amount, Money::from_minor(5000));
    assert_eq!(order.amount, item_total);
    assert_eq!(order.platform_fee, Money::ZERO);
    assert_eq!(order.organizer_take_home, order.amount);
}

#[tokio::test]
async fn paid_order_carries_fee_split_and_stays_pending() {
    let h = Harness::new().await;
    h.seed_payout_account().await;
    let ticket = h.seed_ticket_type("General", 5000, 100).await;

    let receipt = h
        .orchestrator
        .create_order(h.request(vec![TicketSelection {
            ticket_type_id: ticket,
            quantity: 1,
        }]))
        .await
        .unwrap();

    assert_eq!(receipt.status, OrderStatus::Pending);
    assert_eq!(receipt.provider, ProviderKind::Paystack);
    assert!(receipt.reference.is_some());
    assert!(receipt.checkout_url.is_some());

    let order = h.storage.order(receipt.order_id).await.unwrap();
    assert_eq!(order.amount, Money::from_minor(5000));
    assert_eq!(order.platform_fee, Money::from_minor(500));
    assert_eq!(order.organizer_take_home, Money::from_minor(4500));
    assert_eq!(order.provider_reference, receipt.reference);

    // Capacity is claimed at reservation, before payment settles.
    assert_eq!(h.storage.ticket_type(ticket).await.unwrap().quantity_sold, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_never_oversell() {
    let h = Harness::new().await;
    let ticket = h.seed_ticket_type("Limited", 0, 5).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let orchestrator = h.orchestrator.clone();
        let request = h.request(vec![TicketSelection {
            ticket_type_id: ticket,
            quantity: 1,
        }]);
        handles.push(tokio::spawn(
            async move { orchestrator.create_order(request).await },
        ));
    }

    let mut succeeded = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(CoreError::InsufficientInventory { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(succeeded, 5);
    assert_eq!(rejected, 15);
    let state = h.storage.ticket_type(ticket).await.unwrap();
    assert_eq!(state.quantity_sold, state.quantity_total);
}

#[tokio::test]
async fn multi_line_reservation_is_all_or_nothing() {
    let h = Harness::new().await;
    let plentiful = h.seed_ticket_type("General", 0, 100).await;
    let scarce = h.seed_ticket_type("VIP", 0, 1).await;

    let err = h
        .orchestrator
        .create_order(h.request(vec![
            TicketSelection {
                ticket_type_id: plentiful,
                quantity: 3,
            },
            TicketSelection {
                ticket_type_id: scarce,
                quantity: 2,
            },
        ]))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::InsufficientInventory { .. }));
    // The claim on the first line was rolled back.
    assert_eq!(
        h.storage.ticket_type(plentiful).await.unwrap().quantity_sold,
        0
    );
    assert_eq!(h.storage.ticket_type(scarce).await.unwrap().quantity_sold, 0);
}

#[tokio::test]
async fn missing_payout_account_releases_inventory() {
    let h = Harness::new().await;
    let ticket = h.seed_ticket_type("General", 5000, 10).await;

    let err = h
        .orchestrator
        .create_order(h.request(vec![TicketSelection {
            ticket_type_id: ticket,
            quantity: 2,
        }]))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::PayoutAccountMissing));
    assert_eq!(h.storage.ticket_type(ticket).await.unwrap().quantity_sold, 0);
}

#[tokio::test]
async fn provider_rejection_fails_order_and_releases_inventory() {
    let h = Harness::new().await;
    h.seed_payout_account().await;
    let ticket = h.seed_ticket_type("General", 5000, 10).await;
    h.gateway.set_behavior(MockGatewayBehavior::Reject);

    let err = h
        .orchestrator
        .create_order(h.request(vec![TicketSelection {
            ticket_type_id: ticket,
            quantity: 1,
        }]))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::ProviderRejected(_)));
    assert_eq!(h.storage.ticket_type(ticket).await.unwrap().quantity_sold, 0);
}

#[tokio::test]
async fn provider_timeout_leaves_order_pending_with_inventory_held() {
    let h = Harness::new().await;
    h.seed_payout_account().await;
    let ticket = h.seed_ticket_type("General", 5000, 10).await;
    h.gateway.set_behavior(MockGatewayBehavior::Timeout);

    let receipt = h
        .orchestrator
        .create_order(h.request(vec![TicketSelection {
            ticket_type_id: ticket,
            quantity: 1,
        }]))
        .await
        .unwrap();

    // The provider may still complete the intent; reconciliation decides.
    assert_eq!(receipt.status, OrderStatus::Pending);
    assert!(receipt.reference.is_none());
    let order = h.storage.order(receipt.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(h.storage.ticket_type(ticket).await.unwrap().quantity_sold, 1);
}

#[tokio::test]
async fn timeout_order_is_settled_by_its_webhook() {
    let h = Harness::new().await;
    h.seed_payout_account().await;
    let ticket = h.seed_ticket_type("General", 5000, 10).await;
    h.gateway.set_behavior(MockGatewayBehavior::Timeout);

    let receipt = h
        .orchestrator
        .create_order(h.request(vec![TicketSelection {
            ticket_type_id: ticket,
            quantity: 1,
        }]))
        .await
        .unwrap();
    assert!(receipt.reference.is_none());

    // The provider completed the intent after the timeout; its delivery
    // carries a reference the engine never persisted, plus the order id
    // echoed back from initialization metadata.
    let body =
        MockGateway::webhook_body_for_order("mock_late_settle", receipt.order_id, "succeeded");
    let ack = h
        .reconciler
        .handle(ProviderKind::Paystack, &body, MOCK_WEBHOOK_SIGNATURE)
        .await
        .unwrap();
    assert_eq!(ack, ReconcileAck::Applied(PaymentOutcome::Succeeded));

    let order = h.storage.order(receipt.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.provider_reference.as_deref(), Some("mock_late_settle"));
    let items = h.storage.items_of(receipt.order_id).await;
    assert_eq!(items[0].status, TicketStatus::Sold);
    assert_eq!(h.storage.ticket_type(ticket).await.unwrap().quantity_sold, 1);

    // A retry of the same delivery now resolves through the backfilled
    // reference and is a no-op.
    let retry = h
        .reconciler
        .handle(ProviderKind::Paystack, &body, MOCK_WEBHOOK_SIGNATURE)
        .await
        .unwrap();
    assert_eq!(retry, ReconcileAck::AlreadyFinal);
}

#[tokio::test]
async fn timeout_order_failure_webhook_releases_inventory() {
    let h = Harness::new().await;
    h.seed_payout_account().await;
    let ticket = h.seed_ticket_type("General", 5000, 10).await;
    h.gateway.set_behavior(MockGatewayBehavior::Timeout);

    let receipt = h
        .orchestrator
        .create_order(h.request(vec![TicketSelection {
            ticket_type_id: ticket,
            quantity: 1,
        }]))
        .await
        .unwrap();

    let body = MockGateway::webhook_body_for_order("mock_late_fail", receipt.order_id, "failed");
    let ack = h
        .reconciler
        .handle(ProviderKind::Paystack, &body, MOCK_WEBHOOK_SIGNATURE)
        .await
        .unwrap();
    assert_eq!(ack, ReconcileAck::Applied(PaymentOutcome::Failed));
    assert_eq!(h.storage.ticket_type(ticket).await.unwrap().quantity_sold, 0);
}

#[tokio::test]
async fn successful_webhook_is_applied_exactly_once() {
    let h = Harness::new().await;
    h.seed_payout_account().await;
    let ticket = h.seed_ticket_type("General", 5000, 10).await;

    let receipt = h
        .orchestrator
        .create_order(h.request(vec![TicketSelection {
            ticket_type_id: ticket,
            quantity: 1,
        }]))
        .await
        .unwrap();
    let reference = receipt.reference.unwrap();
    let body = MockGateway::webhook_body(&reference, "succeeded");

    let first = h
        .reconciler
        .handle(ProviderKind::Paystack, &body, MOCK_WEBHOOK_SIGNATURE)
        .await
        .unwrap();
    assert_eq!(first, ReconcileAck::Applied(PaymentOutcome::Succeeded));

    // Provider retry of the same delivery.
    let second = h
        .reconciler
        .handle(ProviderKind::Paystack, &body, MOCK_WEBHOOK_SIGNATURE)
        .await
        .unwrap();
    assert_eq!(second, ReconcileAck::AlreadyFinal);

    let order = h.storage.order(receipt.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    let items = h.storage.items_of(receipt.order_id).await;
    assert_eq!(items[0].status, TicketStatus::Sold);
    // Capacity was claimed at reservation; settlement does not re-claim.
    assert_eq!(h.storage.ticket_type(ticket).await.unwrap().quantity_sold, 1);

    settle_background_tasks().await;
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn failed_webhook_releases_inventory() {
    let h = Harness::new().await;
    h.seed_payout_account().await;
    let ticket = h.seed_ticket_type("General", 5000, 10).await;

    let receipt = h
        .orchestrator
        .create_order(h.request(vec![TicketSelection {
            ticket_type_id: ticket,
            quantity: 2,
        }]))
        .await
        .unwrap();
    let body = MockGateway::webhook_body(&receipt.reference.unwrap(), "failed");

    let ack = h
        .reconciler
        .handle(ProviderKind::Paystack, &body, MOCK_WEBHOOK_SIGNATURE)
        .await
        .unwrap();
    assert_eq!(ack, ReconcileAck::Applied(PaymentOutcome::Failed));

    let order = h.storage.order(receipt.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Failed);
    assert_eq!(h.storage.ticket_type(ticket).await.unwrap().quantity_sold, 0);

    settle_background_tasks().await;
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn invalid_signature_touches_nothing() {
    let h = Harness::new().await;
    h.seed_payout_account().await;
    let ticket = h.seed_ticket_type("General", 5000, 10).await;

    let receipt = h
        .orchestrator
        .create_order(h.request(vec![TicketSelection {
            ticket_type_id: ticket,
            quantity: 1,
        }]))
        .await
        .unwrap();
    let body = MockGateway::webhook_body(&receipt.reference.unwrap(), "succeeded");

    let err = h
        .reconciler
        .handle(ProviderKind::Paystack, &body, "forged")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::SignatureInvalid));

    let order = h.storage.order(receipt.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn unmatched_reference_is_acknowledged() {
    let h = Harness::new().await;
    let body = MockGateway::webhook_body("mock_unknown", "succeeded");

    let ack = h
        .reconciler
        .handle(ProviderKind::Paystack, &body, MOCK_WEBHOOK_SIGNATURE)
        .await
        .unwrap();
    assert_eq!(ack, ReconcileAck::Unmatched);
}

#[tokio::test]
async fn non_actionable_event_types_are_ignored() {
    let h = Harness::new().await;
    let body = MockGateway::webhook_body("mock_whatever", "created");

    let ack = h
        .reconciler
        .handle(ProviderKind::Paystack, &body, MOCK_WEBHOOK_SIGNATURE)
        .await
        .unwrap();
    assert_eq!(ack, ReconcileAck::Ignored);
}

#[tokio::test]
async fn attendee_roster_is_truncated_to_purchased_quantity() {
    let h = Harness::new().await;
    let ticket = h.seed_ticket_type("Community", 0, 50).await;

    let mut request = h.request(vec![TicketSelection {
        ticket_type_id: ticket,
        quantity: 2,
    }]);
    request.attendees = (0..4)
        .map(|i| AttendeeEntry {
            ticket_type_id: ticket,
            name: Some(format!("Guest {i}")),
            email: Some(format!("guest{i}@example.com")),
        })
        .collect();

    let receipt = h.orchestrator.create_order(request).await.unwrap();
    let items = h.storage.items_of(receipt.order_id).await;
    assert_eq!(items[0].attendees.len(), 2);
}

#[tokio::test]
async fn check_in_conflicts_on_second_scan() {
    let h = Harness::new().await;
    h.seed_payout_account().await;
    let ticket = h.seed_ticket_type("General", 5000, 10).await;
    let staff = UserId::new();
    h.storage
        .insert_membership(staff, h.organization_id, OrgRole::Member)
        .await;

    let receipt = h
        .orchestrator
        .create_order(h.request(vec![TicketSelection {
            ticket_type_id: ticket,
            quantity: 1,
        }]))
        .await
        .unwrap();
    let body = MockGateway::webhook_body(&receipt.reference.unwrap(), "succeeded");
    h.reconciler
        .handle(ProviderKind::Paystack, &body, MOCK_WEBHOOK_SIGNATURE)
        .await
        .unwrap();

    let token = h.storage.items_of(receipt.order_id).await[0]
        .ticket_token
        .clone();

    let item = h.checkin.check_in(staff, &token).await.unwrap();
    assert_eq!(item.status, TicketStatus::CheckedIn);

    let err = h.checkin.check_in(staff, &token).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyCheckedIn));
}

#[tokio::test]
async fn check_in_requires_organization_membership() {
    let h = Harness::new().await;
    let ticket = h.seed_ticket_type("Community", 0, 10).await;
    let outsider = UserId::new();

    let receipt = h
        .orchestrator
        .create_order(h.request(vec![TicketSelection {
            ticket_type_id: ticket,
            quantity: 1,
        }]))
        .await
        .unwrap();
    let token = h.storage.items_of(receipt.order_id).await[0]
        .ticket_token
        .clone();

    let err = h.checkin.check_in(outsider, &token).await.unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)));
}

#[tokio::test]
async fn unpaid_ticket_cannot_be_checked_in() {
    let h = Harness::new().await;
    h.seed_payout_account().await;
    let ticket = h.seed_ticket_type("General", 5000, 10).await;
    let staff = UserId::new();
    h.storage
        .insert_membership(staff, h.organization_id, OrgRole::Member)
        .await;

    let receipt = h
        .orchestrator
        .create_order(h.request(vec![TicketSelection {
            ticket_type_id: ticket,
            quantity: 1,
        }]))
        .await
        .unwrap();
    // No webhook has settled the order; the item is still Available.
    let token = h.storage.items_of(receipt.order_id).await[0]
        .ticket_token
        .clone();

    let err = h.checkin.check_in(staff, &token).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn paid_finalize_marks_items_in_the_same_step() {
    let h = Harness::new().await;
    h.seed_payout_account().await;
    let ticket = h.seed_ticket_type("General", 5000, 10).await;

    let receipt = h
        .orchestrator
        .create_order(h.request(vec![TicketSelection {
            ticket_type_id: ticket,
            quantity: 2,
        }]))
        .await
        .unwrap();

    // The status CAS alone moves the items to sold; no separate item
    // update can be lost between the two.
    let orders = h.storage.storage().orders;
    assert!(orders
        .begin_finalize(receipt.order_id, OrderStatus::Paid)
        .await
        .unwrap());

    let items = h.storage.items_of(receipt.order_id).await;
    assert!(items.iter().all(|item| item.status == TicketStatus::Sold));
}

#[tokio::test]
async fn notifier_failure_does_not_fail_the_order() {
    let h = Harness::new().await;
    let ticket = h.seed_ticket_type("Community", 0, 10).await;
    h.notifier.fail_next_pushes();

    let receipt = h
        .orchestrator
        .create_order(h.request(vec![TicketSelection {
            ticket_type_id: ticket,
            quantity: 1,
        }]))
        .await
        .unwrap();

    settle_background_tasks().await;
    assert_eq!(receipt.status, OrderStatus::Paid);
    assert!(h.notifier.sent().is_empty());
}
