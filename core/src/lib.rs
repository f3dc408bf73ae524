//! # Gatepass Core
//!
//! Order & inventory reconciliation engine for an event-ticketing
//! marketplace. The engine turns a buyer's ticket selection into a
//! confirmed order while guaranteeing:
//!
//! - exactly-once inventory decrement under concurrent purchases of the
//!   same ticket type (atomic check-and-reserve at the storage seam),
//! - correct platform/organizer fee splitting and provider routing,
//! - idempotent terminal transitions driven by untrusted, possibly
//!   duplicated webhook deliveries,
//! - ticket issuance and notification side effects exactly once per paid
//!   order.
//!
//! Storage, payment rails, and the notification sink are trait seams; see
//! `gatepass-postgres`, `gatepass-providers`, and `gatepass-testing` for
//! the production and test implementations.

pub mod checkin;
pub mod error;
pub mod fees;
pub mod gateway;
pub mod inventory;
pub mod metrics;
pub mod notify;
pub mod orders;
pub mod reconcile;
pub mod store;
pub mod types;

pub use checkin::CheckInService;
pub use error::{CoreError, CoreResult};
pub use gateway::{GatewayRegistry, PaymentGateway, PaymentInit, PaymentOutcome, WebhookEvent};
pub use inventory::InventoryLedger;
pub use notify::{Notifier, NotifyCategory};
pub use orders::{CreateOrderRequest, OrderOrchestrator, OrderReceipt, TicketSelection};
pub use reconcile::{ReconcileAck, WebhookReconciler};
pub use store::Storage;
