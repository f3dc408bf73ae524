//! # Gatepass Web
//!
//! Axum HTTP API for the Gatepass order engine: order creation, provider
//! webhooks, ticket check-in, and read endpoints for provider routing and
//! ticket availability.
//!
//! Webhook endpoints read the raw request body before any deserialization;
//! signatures are computed over the exact bytes the provider sent.

pub mod api;
pub mod config;
pub mod error;
pub mod notify;
pub mod server;

pub use config::Config;
pub use error::ApiError;
pub use server::{build_router, AppState};
