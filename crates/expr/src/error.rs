//! Error type for the `expr` crate.
//!
//! Per the calling convention used throughout this crate, these errors are
//! almost never surfaced to a workflow author: callers in `engine` catch
//! them, log a `tracing::warn!`, and fall back to `false` / a no-op.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("eval error: {0}")]
    Eval(String),
}
