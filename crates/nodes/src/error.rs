//! Node-level error type.

use thiserror::Error;

/// A node executor's failure reason.
///
/// Per spec §7, a node failure is never thrown up to the caller as a fatal
/// error — the executor that produces it catches it, writes a `failed`
/// node execution record carrying this message, and the workflow keeps
/// running. There is no retry classification here: retrying a failed node
/// is a distributed-scheduling concern the spec explicitly places out of
/// scope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct NodeError(pub String);

impl NodeError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
