//! # Gatepass Providers
//!
//! [`gatepass_core::gateway::PaymentGateway`] implementations for the two
//! supported rails:
//!
//! - [`StripeGateway`]: card payments via the Stripe PaymentIntents API,
//!   with the platform fee carried as `application_fee_amount` and the
//!   organizer cut routed through `transfer_data[destination]`.
//! - [`PaystackGateway`]: the Nigerian local rail via the Paystack
//!   transaction API, with the organizer cut routed to a subaccount and the
//!   platform fee as `transaction_charge`.
//!
//! Both gateways verify webhook signatures over the exact raw request body
//! using constant-time HMAC comparison. Keys are optional at construction:
//! a gateway missing the key an operation needs reports
//! `ProviderUnconfigured` instead of panicking, so a deployment can run
//! with only one rail configured.

pub mod paystack;
pub mod stripe;

pub use paystack::{PaystackConfig, PaystackGateway};
pub use stripe::{StripeConfig, StripeGateway};
