//! Paystack gateway: the Nigerian local rail.

use async_trait::async_trait;
use gatepass_core::error::{CoreError, CoreResult};
use gatepass_core::gateway::{
    PaymentGateway, PaymentInit, PaymentOutcome, SplitInstruction, WebhookEvent,
};
use gatepass_core::types::{Order, OrderId, ProviderKind};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha512;
use std::time::Duration;

type HmacSha512 = Hmac<Sha512>;

const DEFAULT_API_URL: &str = "https://api.paystack.co";

/// Paystack credentials and request policy.
#[derive(Clone, Debug)]
pub struct PaystackConfig {
    /// API secret key (`sk_…`). Doubles as the webhook signing key;
    /// Paystack signs deliveries with the account secret.
    pub secret_key: Option<String>,
    /// Bound on each outbound request.
    pub timeout: Duration,
}

impl Default for PaystackConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Local rail gateway.
#[derive(Clone)]
pub struct PaystackGateway {
    client: Client,
    config: PaystackConfig,
    api_url: String,
}

#[derive(Deserialize)]
struct InitializeResponse {
    data: InitializeData,
}

#[derive(Deserialize)]
struct InitializeData {
    authorization_url: String,
    reference: String,
}

#[derive(Deserialize)]
struct PaystackEvent {
    event: String,
    data: PaystackEventData,
}

#[derive(Deserialize)]
struct PaystackEventData {
    reference: String,
    #[serde(default)]
    metadata: Option<PaystackMetadata>,
}

#[derive(Deserialize)]
struct PaystackMetadata {
    order_id: Option<String>,
}

impl PaystackGateway {
    /// Creates a gateway with the given configuration.
    #[must_use]
    pub fn new(config: PaystackConfig) -> Self {
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
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Paystack
    }

    async fn initialize(
        &self,
        order: &Order,
        split: &SplitInstruction,
    ) -> CoreResult<PaymentInit> {
        let Some(secret) = self.config.secret_key.as_deref() else {
            return Err(CoreError::ProviderUnconfigured("paystack"));
        };

        // The organizer subaccount receives the settlement and bears the
        // charge, so `transaction_charge` is exactly the platform's cut.
        let mut payload = json!({
            "email": order.buyer.email,
            "amount": order.amount.minor(),
            "currency": order.currency.as_str(),
            "reference": format!("gp_{}", order.id.as_uuid().simple()),
            "subaccount": split.payout_account.provider_account_code,
            "metadata": { "order_id": order.id.to_string() },
        });
        if !split.platform_fee.is_zero() {
            payload["bearer"] = json!("subaccount");
            payload["transaction_charge"] = json!(split.platform_fee.minor());
        }

        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.api_url))
            .bearer_auth(secret)
            .timeout(self.config.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::ProviderRejected(format!(
                "paystack returned {status}: {body}"
            )));
        }

        let init: InitializeResponse = response
            .json()
            .await
            .map_err(|err| CoreError::ProviderRejected(format!("paystack response: {err}")))?;
        tracing::debug!(order_id = %order.id, reference = %init.data.reference, "paystack transaction initialized");

        Ok(PaymentInit {
            reference: init.data.reference,
            checkout_url: Some(init.data.authorization_url),
        })
    }

    fn verify_webhook(&self, raw_body: &[u8], signature: &str) -> CoreResult<WebhookEvent> {
        let Some(secret) = self.config.secret_key.as_deref() else {
            return Err(CoreError::ProviderUnconfigured("paystack"));
        };

        // Signature is HMAC-SHA512 of the raw body, hex-encoded.
        let expected = hex::decode(signature).map_err(|_| CoreError::SignatureInvalid)?;
        let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
            .map_err(|_| CoreError::SignatureInvalid)?;
        mac.update(raw_body);
        mac.verify_slice(&expected)
            .map_err(|_| CoreError::SignatureInvalid)?;

        let event: PaystackEvent = serde_json::from_slice(raw_body)
            .map_err(|err| CoreError::Validation(format!("paystack webhook body: {err}")))?;
        let outcome = match event.event.as_str() {
            "charge.success" => Some(PaymentOutcome::Succeeded),
            "charge.failed" => Some(PaymentOutcome::Failed),
            _ => None,
        };
        // `metadata.order_id` is set at initialization and echoed back
        // here; it resolves orders that never received a reference.
        let order_id = event
            .data
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.order_id.as_deref())
            .and_then(|raw| uuid::Uuid::parse_str(raw).ok())
            .map(OrderId::from_uuid);
        Ok(WebhookEvent {
            reference: event.data.reference,
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
