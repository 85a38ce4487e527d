//! Repository functions — one module per table family, one function per
//! database operation. Every function takes a `&DbPool` and returns a
//! `Result<T, DbError>`. No business logic, no domain types — pure SQL,
//! composed into the `Ledger` trait implementation in [`crate::ledger`].

pub mod executions;
pub mod forms;
pub mod metrics;
