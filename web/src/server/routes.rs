//! Router configuration.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{checkin, events, orders, payments, webhooks};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Builds the complete router.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/orders", post(orders::create_order))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/webhook/stripe", post(webhooks::stripe_webhook))
        .route("/orders/webhook/paystack", post(webhooks::paystack_webhook))
        .route("/orders/check-in", post(checkin::check_in))
        .route("/payments/provider", get(payments::provider_for_country))
        .route("/events/:id/ticket-types", get(events::list_ticket_types));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
