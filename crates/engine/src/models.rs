//! Core domain models for the workflow engine — the graph JSON schema of
//! spec §6, unchanged on the wire.
//!
//! These types are the source of truth for what a graph looks like once
//! loaded; they serialize back to exactly the same shape (`graph_json` in
//! the ledger is this struct, round-tripped).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single step in the workflow graph. `kind` is kept as a raw string
/// (`service|decision|form|subworkflow`) rather than a closed enum:
/// recognizing an unsupported kind is the graph *compiler's* job (a fatal
/// compilation error per spec §4.E), not a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl NodeDefinition {
    /// `data.label` if present, else the node's own id — matches the
    /// original's `node_data.get("data", {}).get("label", node_id)`.
    pub fn label(&self) -> String {
        self.data
            .get("label")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.id.clone())
    }
}

/// Directed edge from one node to another, with an optional routing
/// condition (an expression string evaluated against `state`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub condition: Option<String>,
}

/// A complete workflow graph document, exactly as received from callers and
/// as persisted verbatim in `workflow_executions.graph_json`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkflowGraph {
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}
