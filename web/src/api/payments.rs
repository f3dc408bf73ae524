//! Provider routing endpoint.

use axum::extract::Query;
use axum::Json;
use gatepass_core::gateway::select_provider;
use serde::{Deserialize, Serialize};

/// Query parameters for `GET /api/payments/provider`.
#[derive(Debug, Deserialize)]
pub struct ProviderQuery {
    /// Event host country.
    pub country: Option<String>,
}

/// Provider routing response.
#[derive(Debug, Serialize)]
pub struct ProviderResponse {
    /// Rail orders from this country settle through.
    pub provider: &'static str,
}

/// `GET /api/payments/provider?country=`
pub async fn provider_for_country(Query(query): Query<ProviderQuery>) -> Json<ProviderResponse> {
    let provider = select_provider(query.country.as_deref());
    Json(ProviderResponse {
        provider: provider.as_str(),
    })
}
