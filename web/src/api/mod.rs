//! API handlers.

pub mod checkin;
pub mod events;
pub mod orders;
pub mod payments;
pub mod webhooks;
