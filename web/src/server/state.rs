//! Application state shared across handlers.

use gatepass_core::notify::Notifier;
use gatepass_core::store::Storage;
use gatepass_core::{CheckInService, GatewayRegistry, OrderOrchestrator, WebhookReconciler};
use std::sync::Arc;

/// Shared state for the API handlers. Cloned per request; all members are
/// cheap handles.
#[derive(Clone)]
pub struct AppState {
    /// Order creation flow.
    pub orchestrator: OrderOrchestrator,
    /// Webhook reconciliation flow.
    pub reconciler: WebhookReconciler,
    /// Gate check-in flow.
    pub checkin: CheckInService,
    /// Direct store access for read endpoints.
    pub storage: Storage,
}

impl AppState {
    /// Wires the services over one storage bundle and gateway registry.
    #[must_use]
    pub fn new(
        storage: Storage,
        gateways: GatewayRegistry,
        notifier: Arc<dyn Notifier>,
        platform_fee_percent: u8,
    ) -> Self {
        Self {
            orchestrator: OrderOrchestrator::new(
                storage.clone(),
                gateways.clone(),
                notifier.clone(),
                platform_fee_percent,
            ),
            reconciler: WebhookReconciler::new(storage.clone(), gateways, notifier),
            checkin: CheckInService::new(storage.clone()),
            storage,
        }
    }
}
