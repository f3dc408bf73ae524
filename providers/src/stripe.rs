//! Stripe gateway: card payments through the PaymentIntents API.

use async_trait::async_trait;
use gatepass_core::error::{CoreError, CoreResult};
use gatepass_core::gateway::{
    PaymentGateway, PaymentInit, PaymentOutcome, SplitInstruction, WebhookEvent,
};
use gatepass_core::types::{Order, OrderId, ProviderKind};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_API_URL: &str = "https://api.stripe.com/v1";

/// Deliveries older than this are rejected even with a valid signature.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Stripe credentials and request policy.
#[derive(Clone, Debug)]
pub struct StripeConfig {
    /// API secret key (`sk_…`). Absent means the rail is not configured
    /// for payment initialization.
    pub secret_key: Option<String>,
    /// Webhook signing secret (`whsec_…`). Absent means webhook
    /// deliveries cannot be verified.
    pub webhook_secret: Option<String>,
    /// Bound on each outbound request.
    pub timeout: Duration,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            webhook_secret: None,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Card rail gateway.
#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    config: StripeConfig,
    api_url: String,
}

#[derive(Deserialize)]
struct PaymentIntent {
    id: String,
}

#[derive(Deserialize)]
struct StripeEvent {
    #[serde(rename = "type")]
    kind: String,
    data: StripeEventData,
}

#[derive(Deserialize)]
struct StripeEventData {
    object: StripeObject,
}

#[derive(Deserialize)]
struct StripeObject {
    id: String,
    #[serde(default)]
    metadata: StripeMetadata,
}

#[derive(Default, Deserialize)]
struct StripeMetadata {
    order_id: Option<String>,
}

impl StripeGateway {
    /// Creates a gateway with the given configuration.
    #[must_use]
    pub fn new(config: StripeConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Overrides the API base URL (tests).
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    fn verify_signature(&self, raw_body: &[u8], signature: &str) -> CoreResult<()> {
        let Some(secret) = self.config.webhook_secret.as_deref() else {
            return Err(CoreError::ProviderUnconfigured("stripe"));
        };

        // Header shape: `t=<unix>,v1=<hex>[,v1=<hex>…]`.
        let mut timestamp: Option<&str> = None;
        let mut candidates: Vec<&str> = Vec::new();
        for part in signature.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => candidates.push(value),
                _ => {}
            }
        }
        let (Some(timestamp), false) = (timestamp, candidates.is_empty()) else {
            return Err(CoreError::SignatureInvalid);
        };

        let Ok(sent_at) = timestamp.parse::<i64>() else {
            return Err(CoreError::SignatureInvalid);
        };
        let age = chrono::Utc::now().timestamp() - sent_at;
        if age.abs() > SIGNATURE_TOLERANCE_SECS {
            return Err(CoreError::SignatureInvalid);
        }

        // The signed payload is `{t}.{raw_body}` over the exact bytes
        // received.
        for candidate in candidates {
            let Ok(expected) = hex::decode(candidate) else {
                continue;
            };
            let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
                return Err(CoreError::SignatureInvalid);
            };
            mac.update(timestamp.as_bytes());
            mac.update(b".");
            mac.update(raw_body);
            if mac.verify_slice(&expected).is_ok() {
                return Ok(());
            }
        }
        Err(CoreError::SignatureInvalid)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Stripe
    }

    async fn initialize(
        &self,
        order: &Order,
        split: &SplitInstruction,
    ) -> CoreResult<PaymentInit> {
        let Some(secret) = self.config.secret_key.as_deref() else {
            return Err(CoreError::ProviderUnconfigured("stripe"));
        };

        let amount = order.amount.minor().to_string();
        let currency = order.currency.as_str().to_lowercase();
        let fee = split.platform_fee.minor().to_string();
        let order_id = order.id.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", currency.as_str()),
            ("payment_method_types[]", "card"),
            ("application_fee_amount", fee.as_str()),
            (
                "transfer_data[destination]",
                split.payout_account.provider_account_code.as_str(),
            ),
            ("metadata[order_id]", order_id.as_str()),
        ];

        let response = self
            .client
            .post(format!("{}/payment_intents", self.api_url))
            .bearer_auth(secret)
            .timeout(self.config.timeout)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::ProviderRejected(format!(
                "stripe returned {status}: {body}"
            )));
        }

        let intent: PaymentIntent = response
            .json()
            .await
            .map_err(|err| CoreError::ProviderRejected(format!("stripe response: {err}")))?;
        tracing::debug!(order_id = %order.id, intent = %intent.id, "stripe payment intent created");

        Ok(PaymentInit {
            reference: intent.id,
            checkout_url: None,
        })
    }

    fn verify_webhook(&self, raw_body: &[u8], signature: &str) -> CoreResult<WebhookEvent> {
        self.verify_signature(raw_body, signature)?;

        let event: StripeEvent = serde_json::from_slice(raw_body)
            .map_err(|err| CoreError::Validation(format!("stripe webhook body: {err}")))?;
        let outcome = match event.kind.as_str() {
            "payment_intent.succeeded" => Some(PaymentOutcome::Succeeded),
            "payment_intent.payment_failed" => Some(PaymentOutcome::Failed),
            _ => None,
        };
        // `metadata[order_id]` is set at initialization and echoed back
        // here; it resolves orders that never received a reference.
        let order_id = event
            .data
            .object
            .metadata
            .order_id
            .as_deref()
            .and_then(|raw| uuid::Uuid::parse_str(raw).ok())
            .map(OrderId::from_uuid);
        Ok(WebhookEvent {
            reference: event.data.object.id,
            order_id,
            outcome,
        })
    }
}

fn transport_error(err: reqwest::Error) -> CoreError {
    if err.is_timeout() {
        CoreError::ProviderTimeout
    } else {
        CoreError::ProviderRejected(err.to_string())
    }
}
