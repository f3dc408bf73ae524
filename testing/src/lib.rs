//! # Gatepass Testing
//!
//! Testing utilities for the Gatepass order engine:
//!
//! - [`MemoryStorage`]: in-memory implementation of every storage trait,
//!   with all tables behind a single async mutex. That mutex is the
//!   serialized critical section that makes `reserve` atomic, so the
//!   oversell invariant holds under concurrent tasks exactly as it does
//!   against the conditional `UPDATE` in Postgres.
//! - [`MockGateway`]: programmable payment gateway with trivially signed
//!   webhooks for driving the reconciler in tests.
//! - [`RecordingNotifier`]: captures notification fan-out for assertions.

pub mod gateway;
pub mod notifier;
pub mod storage;

pub use gateway::{MockGateway, MockGatewayBehavior, MOCK_WEBHOOK_SIGNATURE};
pub use notifier::{PushedNotification, RecordingNotifier};
pub use storage::MemoryStorage;
