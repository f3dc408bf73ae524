//! Business metrics for the order engine.
//!
//! # Exported metrics
//!
//! ## Counters
//! - `gatepass_orders_created_total{kind}` - orders created (free, paid)
//! - `gatepass_orders_reconciled_total{outcome}` - webhook reconciliations applied
//! - `gatepass_tickets_sold_total` - individual tickets sold
//! - `gatepass_oversell_rejections_total` - reservations lost to the capacity race
//! - `gatepass_webhook_signature_failures_total{provider}` - rejected deliveries
//! - `gatepass_checkins_total` - successful gate check-ins

use metrics::{counter, describe_counter};

/// Registers metric descriptions. Call once at startup, before recording.
pub fn register_business_metrics() {
    describe_counter!(
        "gatepass_orders_created_total",
        "Total orders created, labelled by kind (free, paid)"
    );
    describe_counter!(
        "gatepass_orders_reconciled_total",
        "Total webhook reconciliations that applied a terminal status, by outcome"
    );
    describe_counter!(
        "gatepass_tickets_sold_total",
        "Total individual tickets transitioned to sold"
    );
    describe_counter!(
        "gatepass_oversell_rejections_total",
        "Total reservation attempts that lost the capacity race"
    );
    describe_counter!(
        "gatepass_webhook_signature_failures_total",
        "Total webhook deliveries rejected for an invalid signature, by provider"
    );
    describe_counter!(
        "gatepass_checkins_total",
        "Total successful ticket check-ins"
    );
}

pub(crate) fn record_order_created(kind: &'static str) {
    counter!("gatepass_orders_created_total", "kind" => kind).increment(1);
}

pub(crate) fn record_reconciled(outcome: &'static str) {
    counter!("gatepass_orders_reconciled_total", "outcome" => outcome).increment(1);
}

pub(crate) fn record_tickets_sold(count: u64) {
    counter!("gatepass_tickets_sold_total").increment(count);
}

pub(crate) fn record_oversell_rejection() {
    counter!("gatepass_oversell_rejections_total").increment(1);
}

pub(crate) fn record_signature_failure(provider: &'static str) {
    counter!("gatepass_webhook_signature_failures_total", "provider" => provider).increment(1);
}

pub(crate) fn record_checkin() {
    counter!("gatepass_checkins_total").increment(1);
}
