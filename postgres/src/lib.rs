//! # Gatepass Postgres
//!
//! `PostgreSQL` storage backend for the Gatepass order engine. Implements
//! every storage trait from `gatepass-core` over a single connection pool.
//!
//! The racy invariants live in the SQL, not in application code: capacity
//! claims are a conditional `UPDATE … WHERE quantity_sold + n <=
//! quantity_total`, terminal order transitions are a conditional `UPDATE …
//! WHERE status IN ('pending', 'requires_action')`, and check-in is a
//! conditional `UPDATE … WHERE status = 'sold'`. Each returns its affected
//! row count, which is the compare-and-set verdict.

pub mod storage;

pub use storage::PgStorage;
