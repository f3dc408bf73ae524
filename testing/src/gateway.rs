//! Scriptable payment gateway.

use async_trait::async_trait;
use gatepass_core::error::{CoreError, CoreResult};
use gatepass_core::gateway::{
    PaymentGateway, PaymentInit, PaymentOutcome, SplitInstruction, WebhookEvent,
};
use gatepass_core::types::{Order, OrderId, ProviderKind};
use serde::Deserialize;
use std::sync::{Arc, Mutex};

/// Signature every mock webhook delivery must carry.
pub const MOCK_WEBHOOK_SIGNATURE: &str = "mock-signature";

/// How the mock responds to `initialize`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockGatewayBehavior {
    /// Returns a reference and checkout URL.
    Succeed,
    /// Returns [`CoreError::ProviderRejected`].
    Reject,
    /// Returns [`CoreError::ProviderTimeout`].
    Timeout,
    /// Returns [`CoreError::ProviderUnconfigured`].
    Unconfigured,
}

#[derive(Deserialize)]
struct MockWebhookBody {
    reference: String,
    outcome: String,
    #[serde(default)]
    order_id: Option<String>,
}

/// Payment gateway whose behavior is scripted per test.
#[derive(Clone)]
pub struct MockGateway {
    kind: ProviderKind,
    behavior: Arc<Mutex<MockGatewayBehavior>>,
    initialized: Arc<Mutex<Vec<String>>>,
}

impl MockGateway {
    /// Creates a succeeding mock for the given rail.
    #[must_use]
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            behavior: Arc::new(Mutex::new(MockGatewayBehavior::Succeed)),
            initialized: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Changes how subsequent `initialize` calls respond.
    #[allow(clippy::unwrap_used)]
    pub fn set_behavior(&self, behavior: MockGatewayBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// References handed out so far, in order.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn initialized_references(&self) -> Vec<String> {
        self.initialized.lock().unwrap().clone()
    }

    /// Builds the webhook body the mock's `verify_webhook` accepts.
    #[must_use]
    pub fn webhook_body(reference: &str, outcome: &str) -> Vec<u8> {
        serde_json::json!({ "reference": reference, "outcome": outcome })
            .to_string()
            .into_bytes()
    }

    /// Like [`Self::webhook_body`], also carrying the order id the way a
    /// real provider echoes back initialization metadata.
    #[must_use]
    pub fn webhook_body_for_order(reference: &str, order_id: OrderId, outcome: &str) -> Vec<u8> {
        serde_json::json!({
            "reference": reference,
            "outcome": outcome,
            "order_id": order_id.to_string(),
        })
        .to_string()
        .into_bytes()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    #[allow(clippy::unwrap_used)]
    async fn initialize(
        &self,
        order: &Order,
        _split: &SplitInstruction,
    ) -> CoreResult<PaymentInit> {
        match *self.behavior.lock().unwrap() {
            MockGatewayBehavior::Succeed => {
                let reference = format!("mock_{}", order.id.as_uuid().simple());
                self.initialized.lock().unwrap().push(reference.clone());
                Ok(PaymentInit {
                    checkout_url: Some(format!("https://checkout.test/{reference}")),
                    reference,
                })
            }
            MockGatewayBehavior::Reject => Err(CoreError::ProviderRejected(
                "mock gateway rejected the intent".to_string(),
            )),
            MockGatewayBehavior::Timeout => Err(CoreError::ProviderTimeout),
            MockGatewayBehavior::Unconfigured => Err(CoreError::ProviderUnconfigured("mock")),
        }
    }

    fn verify_webhook(&self, raw_body: &[u8], signature: &str) -> CoreResult<WebhookEvent> {
        if signature != MOCK_WEBHOOK_SIGNATURE {
            return Err(CoreError::SignatureInvalid);
        }
        let body: MockWebhookBody = serde_json::from_slice(raw_body)
            .map_err(|err| CoreError::Validation(format!("malformed webhook body: {err}")))?;
        let outcome = match body.outcome.as_str() {
            "succeeded" => Some(PaymentOutcome::Succeeded),
            "failed" => Some(PaymentOutcome::Failed),
            _ => None,
        };
        let order_id = body
            .order_id
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .map(OrderId::from_uuid);
        Ok(WebhookEvent {
            reference: body.reference,
            order_id,
            outcome,
        })
    }
}
