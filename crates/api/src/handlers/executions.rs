//! `execute`, `resume`, `getExecution`, `listNodeExecutions`, `listExecutions`
//! — the External Surface operations of spec §6 that revolve around one
//! workflow execution.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use db::models::{NodeExecutionRow, WorkflowExecutionRow};
use engine::WorkflowGraph;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub graph: WorkflowGraph,
    #[serde(default)]
    pub inputs: Value,
    #[serde(default)]
    pub workflow_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResumeRequest {
    pub form_data: Value,
}

/// `{status: success|paused|error, execution_id, result, paused_at_form?}` —
/// the wire shape spec §6 names for both `execute` and `resume`.
#[derive(Debug, Serialize)]
pub struct ExecutionResponse {
    pub status: &'static str,
    pub execution_id: Uuid,
    pub result: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_at_form: Option<Value>,
}

impl From<engine::ExecutionSnapshot> for ExecutionResponse {
    fn from(snapshot: engine::ExecutionSnapshot) -> Self {
        let status = match snapshot.status.as_str() {
            "completed" => "success",
            "paused" => "paused",
            _ => "error",
        };
        let paused_at_form = if status == "paused" {
            snapshot.state.get("_paused_at_form").cloned()
        } else {
            None
        };
        Self { status, execution_id: snapshot.execution_id, result: snapshot.state, paused_at_form }
    }
}

pub async fn execute(
    State(state): State<AppState>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<ExecutionResponse>, ApiError> {
    let name = req.workflow_name.as_deref().unwrap_or("unnamed");
    let snapshot = state.runtime.execute(req.graph, req.inputs, name).await?;
    Ok(Json(snapshot.into()))
}

pub async fn resume(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(req): Json<ResumeRequest>,
) -> Result<Json<ExecutionResponse>, ApiError> {
    let snapshot = state.runtime.resume(id, req.form_data).await?;
    Ok(Json(snapshot.into()))
}

#[derive(Debug, Serialize)]
pub struct GetExecutionResponse {
    pub execution: WorkflowExecutionRow,
    pub node_executions: Vec<NodeExecutionRow>,
}

pub async fn get_execution(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<GetExecutionResponse>, ApiError> {
    let id = id.to_string();
    let execution = state.runtime.ledger.get_workflow_execution(&id).await?;
    let node_executions = state.runtime.ledger.list_node_executions(&id).await?;
    Ok(Json(GetExecutionResponse { execution, node_executions }))
}

pub async fn list_node_executions(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<NodeExecutionRow>>, ApiError> {
    let rows = state.runtime.ledger.list_node_executions(&id.to_string()).await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct ListExecutionsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list_executions(
    State(state): State<AppState>,
    Query(query): Query<ListExecutionsQuery>,
) -> Result<Json<Vec<WorkflowExecutionRow>>, ApiError> {
    let rows = state.runtime.ledger.list_recent_executions(query.limit).await?;
    Ok(Json(rows))
}
