//! Error taxonomy for the order engine.
//!
//! Validation and inventory errors are recovered locally (the request fails
//! cleanly, no partial state persists). Provider errors during payment
//! initialization trigger reservation rollback. Signature failures are
//! reported opaquely so callers cannot infer order existence.

use crate::types::TicketTypeId;
use thiserror::Error;

/// Errors produced by the order, reconciliation, and check-in services.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed input, rejected before any side effect.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind (`event`, `order`, `ticket`).
        entity: &'static str,
        /// Identifier that failed to resolve.
        id: String,
    },

    /// Reservation race lost; user-retryable.
    #[error("not enough availability for {ticket_name}: requested {requested}, available {available}")]
    InsufficientInventory {
        /// Offending ticket type.
        ticket_type_id: TicketTypeId,
        /// Ticket type display name, for the buyer-facing message.
        ticket_name: String,
        /// Requested quantity.
        requested: u32,
        /// Capacity remaining at the time of the attempt.
        available: u32,
    },

    /// Organizer has no default active payout account; paid sales blocked.
    #[error("connect a payout account before selling paid tickets")]
    PayoutAccountMissing,

    /// Payment provider credentials are absent for this deployment.
    #[error("payment provider {0} is not configured")]
    ProviderUnconfigured(&'static str),

    /// Upstream provider rejected the request.
    #[error("payment provider rejected the request: {0}")]
    ProviderRejected(String),

    /// Provider call exceeded its bounded timeout. The order stays pending;
    /// reconciliation resolves it later.
    #[error("payment provider timed out")]
    ProviderTimeout,

    /// Webhook signature did not verify. Logged internally as a possible
    /// attack; reported opaquely to the caller.
    #[error("invalid webhook signature")]
    SignatureInvalid,

    /// Ticket token was already redeemed.
    #[error("ticket already checked in")]
    AlreadyCheckedIn,

    /// Actor lacks staff membership for the action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Storage layer failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a not-found error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Convenience alias used throughout the engine.
pub type CoreResult<T> = Result<T, CoreError>;
