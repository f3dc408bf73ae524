//! Payment provider abstraction.
//!
//! Two interchangeable rails (Stripe for cards, Paystack for the Nigerian
//! local rail) sit behind one trait. Provider selection is a pure function
//! of the event's country so it can be tested without any provider wired up.

use crate::error::CoreResult;
use crate::types::{Money, Order, OrderId, PayoutAccount, ProviderKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of initializing a payment intent with a provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentInit {
    /// External reference identifying the intent; unique per order once set.
    pub reference: String,
    /// Hosted checkout URL, when the provider supplies one.
    pub checkout_url: Option<String>,
}

/// Terminal outcome a provider reports for a payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Funds captured.
    Succeeded,
    /// Payment definitively failed.
    Failed,
}

/// A verified, decoded webhook delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookEvent {
    /// External reference carried by the event.
    pub reference: String,
    /// Order id recovered from the event metadata, when the provider echoes
    /// it back. Resolves deliveries for orders whose reference was never
    /// persisted, such as an initialization that timed out after the
    /// provider accepted the intent.
    pub order_id: Option<OrderId>,
    /// Outcome, or `None` for event types the engine does not act on.
    pub outcome: Option<PaymentOutcome>,
}

/// Split instruction passed to the provider at initialization.
#[derive(Clone, Debug)]
pub struct SplitInstruction {
    /// Platform's cut of the order amount, in minor units.
    pub platform_fee: Money,
    /// Organizer settlement destination.
    pub payout_account: PayoutAccount,
}

/// One payment rail.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Which rail this gateway implements.
    fn kind(&self) -> ProviderKind;

    /// Creates an external payment intent for the order, carrying the
    /// platform fee as a destination-split instruction.
    ///
    /// # Errors
    ///
    /// [`crate::error::CoreError::ProviderUnconfigured`] when credentials are
    /// absent, [`crate::error::CoreError::ProviderRejected`] on upstream
    /// validation failure, [`crate::error::CoreError::ProviderTimeout`] when
    /// the bounded request timeout elapses.
    async fn initialize(&self, order: &Order, split: &SplitInstruction)
        -> CoreResult<PaymentInit>;

    /// Verifies a webhook delivery against the exact raw bytes received and
    /// decodes it.
    ///
    /// Signature comparison is constant-time; the payload must not be
    /// re-serialized before verification.
    ///
    /// # Errors
    ///
    /// [`crate::error::CoreError::SignatureInvalid`] when verification
    /// fails, [`crate::error::CoreError::Validation`] for payloads that
    /// verify but do not parse.
    fn verify_webhook(&self, raw_body: &[u8], signature: &str) -> CoreResult<WebhookEvent>;
}

/// Routes an event country to a payment rail.
///
/// Nigeria settles through the local rail; everything else through cards.
/// Pure function by design.
#[must_use]
pub fn select_provider(country: Option<&str>) -> ProviderKind {
    match country.map(|c| c.trim().to_lowercase()) {
        Some(normalized) if normalized == "nigeria" || normalized == "ng" => ProviderKind::Paystack,
        _ => ProviderKind::Stripe,
    }
}

/// Registry of configured gateways keyed by rail.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<ProviderKind, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a gateway under its own `kind()`.
    #[must_use]
    pub fn with(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(gateway.kind(), gateway);
        self
    }

    /// Looks up the gateway for a rail.
    #[must_use]
    pub fn get(&self, kind: ProviderKind) -> Option<&Arc<dyn PaymentGateway>> {
        self.gateways.get(&kind)
    }
}
