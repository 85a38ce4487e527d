//! Engine-level error types.

use thiserror::Error;

/// Errors produced by the graph compiler and the interpreter's control flow.
/// Per spec §7 this is the *only* fatal class — node-level failures are
/// recorded in the ledger and the workflow keeps running instead of
/// surfacing here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A node's `type` has no registered executor factory.
    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),

    /// A graph was compiled with no nodes at all.
    #[error("graph has no nodes")]
    EmptyGraph,

    /// An edge names a `source`/`target` node id absent from the graph's
    /// node list (spec §3 invariant: "node ids referenced by edges must
    /// exist").
    #[error("edge references unknown node id '{0}'")]
    UnknownEdgeEndpoint(String),

    /// The traversal exceeded its visit budget — a defensive guard against
    /// unbounded back-edge loops (spec §9 design note: "an implementer
    /// should add a visit/step budget and fail the workflow on overflow").
    #[error("step budget of {max_steps} exceeded, possible unbounded loop")]
    StepBudgetExceeded { max_steps: u64 },

    /// The execution id does not exist in the ledger.
    #[error("execution '{0}' not found")]
    ExecutionNotFound(String),

    /// `resume` was called against an execution that is not currently paused.
    #[error("execution '{0}' is not paused (status={1})")]
    NotPaused(String, String),

    /// A paused execution's state is missing or malformed `_paused_at_form`.
    #[error("execution '{0}' is paused but carries no usable pause marker")]
    MalformedPauseMarker(String),

    /// Persistence error from the `db` crate.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),
}
