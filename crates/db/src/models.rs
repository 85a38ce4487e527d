//! Row structs that map 1-to-1 onto the four ledger tables of §6.
//!
//! These are *persistence* models — they carry no domain behaviour.
//! Domain types (the workflow graph, execution state) live in the `engine`
//! crate; this crate only ever sees them pre-serialized to JSON text.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// workflow_executions
// ---------------------------------------------------------------------------

/// A persisted workflow execution row. `id` and `parent_execution_id` are
/// stored as their canonical UUID string form; `state_data` and `graph_json`
/// hold UTF-8 JSON text, per §6.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowExecutionRow {
    pub id: String,
    pub workflow_name: String,
    pub status: String,
    pub current_node_id: Option<String>,
    pub state_data: String,
    pub graph_json: String,
    pub parent_execution_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

// ---------------------------------------------------------------------------
// node_executions
// ---------------------------------------------------------------------------

/// A persisted node execution row — one per attempted node execution.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NodeExecutionRow {
    pub id: String,
    pub workflow_execution_id: String,
    pub node_id: String,
    pub node_type: String,
    pub node_label: Option<String>,
    pub status: String,
    pub request_data: Option<String>,
    pub response_data: Option<String>,
    pub error_message: Option<String>,
    pub execution_time_ms: Option<i64>,
    pub started_at: String,
    pub completed_at: Option<String>,
}

// ---------------------------------------------------------------------------
// form_responses
// ---------------------------------------------------------------------------

/// A persisted form submission row, written on `resume`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FormResponseRow {
    pub id: String,
    pub workflow_execution_id: String,
    pub node_id: String,
    pub form_data: String,
    pub submitted_at: String,
}

// ---------------------------------------------------------------------------
// service_metrics
// ---------------------------------------------------------------------------

/// Running call statistics for one service node id, keyed by `node_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceMetricRow {
    pub node_id: String,
    pub total_calls: i64,
    pub successes: i64,
    pub failures: i64,
    pub avg_time_ms: f64,
    pub last_called: String,
}
