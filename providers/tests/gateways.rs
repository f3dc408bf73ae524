//! Gateway HTTP behavior against a mocked provider API.

#![allow(clippy::unwrap_used)]

use gatepass_core::error::CoreError;
use gatepass_core::gateway::{PaymentGateway, SplitInstruction};
use gatepass_core::types::{
    Buyer, Currency, EventId, Money, Order, OrderId, OrderStatus, OrganizationId, PayoutAccount,
    PayoutAccountId, ProviderKind,
};
use gatepass_providers::{PaystackConfig, PaystackGateway, StripeConfig, StripeGateway};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn order(amount: u64) -> Order {
    Order {
        id: OrderId::new(),
        event_id: EventId::new(),
        buyer: Buyer {
            name: "Ada Obi".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
        },
        status: OrderStatus::Pending,
        provider: ProviderKind::Paystack,
        provider_reference: None,
        checkout_url: None,
        currency: Currency::new("NGN"),
        amount: Money::from_minor(amount),
        platform_fee: Money::from_minor(amount / 10),
        organizer_take_home: Money::from_minor(amount - amount / 10),
        payout_account_id: Some(PayoutAccountId::new()),
        created_at: chrono::Utc::now(),
    }
}

fn split(platform_fee: u64, provider: ProviderKind, code: &str) -> SplitInstruction {
    SplitInstruction {
        platform_fee: Money::from_minor(platform_fee),
        payout_account: PayoutAccount {
            id: PayoutAccountId::new(),
            organization_id: OrganizationId::new(),
            provider,
            provider_account_code: code.to_string(),
            is_default: true,
            is_active: true,
        },
    }
}

#[tokio::test]
async fn stripe_creates_payment_intent_with_destination_split() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payment_intents"))
        .and(header("authorization", "Bearer sk_test"))
        .and(body_string_contains("application_fee_amount=500"))
        .and(body_string_contains("transfer_data%5Bdestination%5D=acct_org"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "pi_test_1",
            "status": "requires_payment_method"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = StripeGateway::new(StripeConfig {
        secret_key: Some("sk_test".to_string()),
        webhook_secret: None,
        timeout: Duration::from_secs(5),
    })
    .with_api_url(server.uri());

    let init = gateway
        .initialize(&order(5000), &split(500, ProviderKind::Stripe, "acct_org"))
        .await
        .unwrap();
    assert_eq!(init.reference, "pi_test_1");
    assert!(init.checkout_url.is_none());
}

#[tokio::test]
async fn stripe_maps_upstream_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payment_intents"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "message": "Invalid currency" }
        })))
        .mount(&server)
        .await;

    let gateway = StripeGateway::new(StripeConfig {
        secret_key: Some("sk_test".to_string()),
        webhook_secret: None,
        timeout: Duration::from_secs(5),
    })
    .with_api_url(server.uri());

    let err = gateway
        .initialize(&order(5000), &split(500, ProviderKind::Stripe, "acct_org"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ProviderRejected(_)));
}

#[tokio::test]
async fn stripe_maps_slow_upstream_to_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payment_intents"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "id": "pi_late" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let gateway = StripeGateway::new(StripeConfig {
        secret_key: Some("sk_test".to_string()),
        webhook_secret: None,
        timeout: Duration::from_millis(100),
    })
    .with_api_url(server.uri());

    let err = gateway
        .initialize(&order(5000), &split(500, ProviderKind::Stripe, "acct_org"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ProviderTimeout));
}

#[tokio::test]
async fn stripe_without_secret_is_unconfigured() {
    let gateway = StripeGateway::new(StripeConfig::default());
    let err = gateway
        .initialize(&order(5000), &split(500, ProviderKind::Stripe, "acct_org"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ProviderUnconfigured("stripe")));
}

#[tokio::test]
async fn paystack_initializes_with_subaccount_split() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .and(header("authorization", "Bearer sk_test"))
        .and(body_string_contains("\"subaccount\":\"ACCT_org\""))
        .and(body_string_contains("\"bearer\":\"subaccount\""))
        .and(body_string_contains("\"transaction_charge\":500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": true,
            "message": "Authorization URL created",
            "data": {
                "authorization_url": "https://checkout.paystack.com/abc123",
                "access_code": "abc123",
                "reference": "gp_test_ref"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = PaystackGateway::new(PaystackConfig {
        secret_key: Some("sk_test".to_string()),
        timeout: Duration::from_secs(5),
    })
    .with_api_url(server.uri());

    let init = gateway
        .initialize(&order(5000), &split(500, ProviderKind::Paystack, "ACCT_org"))
        .await
        .unwrap();
    assert_eq!(init.reference, "gp_test_ref");
    assert_eq!(
        init.checkout_url.as_deref(),
        Some("https://checkout.paystack.com/abc123")
    );
}

#[tokio::test]
async fn paystack_zero_fee_omits_transaction_charge() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": true,
            "data": {
                "authorization_url": "https://checkout.paystack.com/free",
                "reference": "gp_free_ref"
            }
        })))
        .mount(&server)
        .await;

    let gateway = PaystackGateway::new(PaystackConfig {
        secret_key: Some("sk_test".to_string()),
        timeout: Duration::from_secs(5),
    })
    .with_api_url(server.uri());

    let init = gateway
        .initialize(&order(5000), &split(0, ProviderKind::Paystack, "ACCT_org"))
        .await
        .unwrap();
    assert_eq!(init.reference, "gp_free_ref");

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(!body.contains("transaction_charge"));
}

#[tokio::test]
async fn paystack_maps_upstream_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "status": false,
            "message": "Invalid subaccount"
        })))
        .mount(&server)
        .await;

    let gateway = PaystackGateway::new(PaystackConfig {
        secret_key: Some("sk_test".to_string()),
        timeout: Duration::from_secs(5),
    })
    .with_api_url(server.uri());

    let err = gateway
        .initialize(&order(5000), &split(500, ProviderKind::Paystack, "ACCT_org"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ProviderRejected(_)));
}
