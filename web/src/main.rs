//! Gatepass HTTP server.

use anyhow::Context;
use gatepass_core::GatewayRegistry;
use gatepass_postgres::PgStorage;
use gatepass_providers::{PaystackConfig, PaystackGateway, StripeConfig, StripeGateway};
use gatepass_testing::MemoryStorage;
use gatepass_web::config::Config;
use gatepass_web::notify::LogNotifier;
use gatepass_web::server::{build_router, AppState};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatepass=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    gatepass_core::metrics::register_business_metrics();

    let storage = match &config.database_url {
        Some(url) => {
            info!("connecting to postgres");
            let pg = PgStorage::connect(url)
                .await
                .context("connecting to postgres")?;
            pg.run_migrations().await.context("running migrations")?;
            info!("migrations applied");
            pg.storage()
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory storage (development only)");
            MemoryStorage::new().storage()
        }
    };

    let gateways = GatewayRegistry::new()
        .with(Arc::new(StripeGateway::new(StripeConfig {
            secret_key: config.providers.stripe_secret_key.clone(),
            webhook_secret: config.providers.stripe_webhook_secret.clone(),
            timeout: config.providers.timeout,
        })))
        .with(Arc::new(PaystackGateway::new(PaystackConfig {
            secret_key: config.providers.paystack_secret_key.clone(),
            timeout: config.providers.timeout,
        })));

    let state = AppState::new(
        storage,
        gateways,
        Arc::new(LogNotifier),
        config.platform_fee_percent,
    );
    let router = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %addr, "server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to install shutdown handler");
        return;
    }
    info!("shutdown signal received");
}
