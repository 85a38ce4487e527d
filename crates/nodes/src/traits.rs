//! The `ExecutableNode` trait — the contract every node executor fulfils.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::NodeError;

/// Shared context passed to every node during execution. Defined here (in
/// the `nodes` crate) so both `engine` and individual executors can import
/// it without a circular dependency. Carries only what every executor needs
/// to attribute its own ledger writes — per-node config is captured by the
/// factory closure that built the executor, not threaded through here.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub execution_id: Uuid,
}

/// The core node contract (spec §4.D): `(state) -> state'`. A node receives
/// the full execution state and returns its replacement. By convention an
/// executor records its own output at `state[node_id]`; this trait makes no
/// assumption about which key that is.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    async fn execute(&self, state: Value, ctx: &ExecutionContext) -> Result<Value, NodeError>;
}
