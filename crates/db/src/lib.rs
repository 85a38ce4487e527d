//! `db` crate — the execution ledger (spec §4.C).
//!
//! Provides a connection pool, typed row structs for exactly the four
//! tables of spec §6, repository functions for each, and the `Ledger` trait
//! that `engine` depends on instead of the driver directly.

pub mod error;
pub mod ledger;
pub mod models;
pub mod pool;
pub mod repository;

pub use error::DbError;
pub use ledger::{Ledger, SqliteLedger};
pub use pool::DbPool;
