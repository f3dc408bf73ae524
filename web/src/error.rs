//! Bridging domain errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gatepass_core::error::CoreError;
use serde::Serialize;

/// Error type returned by every API handler.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            CoreError::Validation(_) | CoreError::SignatureInvalid => StatusCode::BAD_REQUEST,
            CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            CoreError::InsufficientInventory { .. } | CoreError::AlreadyCheckedIn => {
                StatusCode::CONFLICT
            }
            CoreError::PayoutAccountMissing => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
            CoreError::ProviderUnconfigured(_) | CoreError::ProviderRejected(_) => {
                StatusCode::BAD_GATEWAY
            }
            CoreError::ProviderTimeout => StatusCode::GATEWAY_TIMEOUT,
            CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match &self.0 {
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            CoreError::PayoutAccountMissing => "PAYOUT_ACCOUNT_MISSING",
            CoreError::ProviderUnconfigured(_) => "PROVIDER_UNCONFIGURED",
            CoreError::ProviderRejected(_) => "PROVIDER_REJECTED",
            CoreError::ProviderTimeout => "PROVIDER_TIMEOUT",
            CoreError::SignatureInvalid => "INVALID_SIGNATURE",
            CoreError::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            CoreError::Forbidden(_) => "FORBIDDEN",
            CoreError::Storage(_) => "INTERNAL_ERROR",
        }
    }

    /// User-facing message. Storage details never leave the process;
    /// signature failures stay opaque so callers cannot infer order state.
    fn message(&self) -> String {
        match &self.0 {
            CoreError::Storage(_) => "internal error".to_string(),
            CoreError::SignatureInvalid => "invalid signature".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.message(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_details_are_not_exposed() {
        let err = ApiError(CoreError::Storage("password=hunter2".to_string()));
        assert_eq!(err.message(), "internal error");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn inventory_conflicts_map_to_409() {
        let err = ApiError(CoreError::AlreadyCheckedIn);
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
