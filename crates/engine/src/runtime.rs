//! Interpreter / Runtime (spec §4.F) — the two public entry points,
//! `execute` and `resume`, and the one shared recursive traversal function,
//! [`run_graph`], that both of them and the `subworkflow` node executor call.
//!
//! "The interpreter is deliberately stateless between calls apart from the
//! ledger: a fresh compile on every invocation is intentional" — so
//! `run_graph` recompiles the graph on every call rather than caching a
//! `CompiledGraph` anywhere.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use db::models::{FormResponseRow, NodeExecutionRow, WorkflowExecutionRow};
use db::Ledger;
use nodes::traits::ExecutionContext;

use crate::compiler::{self, route};
use crate::models::WorkflowGraph;
use crate::EngineError;

/// Shared dependencies every node executor and the runtime itself need.
/// Cheap to clone: `ledger` is a trait object behind an `Arc`, `http` is
/// itself `Arc`-backed by `reqwest`.
#[derive(Clone)]
pub struct Runtime {
    pub ledger: Arc<dyn Ledger>,
    pub http: reqwest::Client,
    pub max_steps: u64,
}

impl Runtime {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("building the service-node HTTP client should never fail");
        Self { ledger, http, max_steps: 10_000 }
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// `execute(graph, inputs, name)` — spec §4.F. Mints a fresh execution
    /// id and walks the graph from its entry node.
    #[instrument(skip(self, graph, inputs), fields(workflow_name))]
    pub async fn execute(
        &self,
        graph: WorkflowGraph,
        inputs: Value,
        workflow_name: &str,
    ) -> Result<ExecutionSnapshot, EngineError> {
        let execution_id = Uuid::new_v4();
        let state = json!({ "input": inputs });
        run_graph(self, &graph, execution_id, workflow_name, None, None, state).await
    }

    /// `resume(execution_id, form_data)` — spec §4.F. Loads the paused
    /// record, merges the form submission into state, and continues
    /// traversal from the paused form node's successor.
    #[instrument(skip(self, form_data))]
    pub async fn resume(
        &self,
        execution_id: Uuid,
        form_data: Value,
    ) -> Result<ExecutionSnapshot, EngineError> {
        let row = self
            .ledger
            .get_workflow_execution(&execution_id.to_string())
            .await
            .map_err(|e| match e {
                db::DbError::NotFound => EngineError::ExecutionNotFound(execution_id.to_string()),
                other => EngineError::Database(other),
            })?;

        if row.status != "paused" {
            return Err(EngineError::NotPaused(execution_id.to_string(), row.status));
        }

        let graph: WorkflowGraph = serde_json::from_str(&row.graph_json)
            .map_err(|_| EngineError::MalformedPauseMarker(execution_id.to_string()))?;
        let mut state: Value = serde_json::from_str(&row.state_data)
            .map_err(|_| EngineError::MalformedPauseMarker(execution_id.to_string()))?;

        let pause_marker = state
            .get("_paused_at_form")
            .cloned()
            .ok_or_else(|| EngineError::MalformedPauseMarker(execution_id.to_string()))?;
        let form_node_id = pause_marker
            .get("node_id")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::MalformedPauseMarker(execution_id.to_string()))?
            .to_string();

        let form_node_label = graph
            .nodes
            .iter()
            .find(|n| n.id == form_node_id)
            .map(|n| n.label())
            .unwrap_or_else(|| form_node_id.clone());

        // Persist the submission and a completed record for the node that
        // had been paused (spec §4.F: "Append a completed node execution
        // for the paused form node").
        let now = Utc::now().to_rfc3339();
        self.ledger
            .append_form_response(&FormResponseRow {
                id: Uuid::new_v4().to_string(),
                workflow_execution_id: execution_id.to_string(),
                node_id: form_node_id.clone(),
                form_data: form_data.to_string(),
                submitted_at: now.clone(),
            })
            .await?;
        self.ledger
            .append_node_execution(&NodeExecutionRow {
                id: Uuid::new_v4().to_string(),
                workflow_execution_id: execution_id.to_string(),
                node_id: form_node_id.clone(),
                node_type: "form".into(),
                node_label: Some(form_node_label),
                status: "completed".into(),
                request_data: None,
                response_data: Some(form_data.to_string()),
                error_message: None,
                execution_time_ms: None,
                started_at: now.clone(),
                completed_at: Some(now),
            })
            .await?;

        if let Some(obj) = state.as_object_mut() {
            obj.remove("_paused_at_form");
            obj.insert(form_node_id.clone(), json!({ "form_data": form_data }));

            // Resume merge direction (spec §9 open question, resolved):
            // form_data keys win over existing state.input keys.
            let input = obj.entry("input").or_insert_with(|| json!({}));
            if !input.is_object() {
                *input = json!({});
            }
            if let (Some(input_obj), Some(form_obj)) = (input.as_object_mut(), form_data.as_object()) {
                for (k, v) in form_obj {
                    input_obj.insert(k.clone(), v.clone());
                }
            }
        }

        // Compile once here purely to find the form node's successor — the
        // interpreter is stateless, so `run_graph` below compiles again.
        let compiled = compiler::compile(&graph, execution_id, self)?;
        let next = route(compiled.routers.get(&form_node_id), &state);

        let parent_execution_id = row
            .parent_execution_id
            .as_deref()
            .and_then(|s| Uuid::parse_str(s).ok());

        run_graph(self, &graph, execution_id, &row.workflow_name, parent_execution_id, next, state).await
    }
}

/// A point-in-time view of an execution, returned by every entry point.
#[derive(Debug, Clone)]
pub struct ExecutionSnapshot {
    pub execution_id: Uuid,
    pub status: String,
    pub current_node_id: Option<String>,
    pub state: Value,
}

struct WalkOutcome {
    status: String,
    current_node_id: Option<String>,
    state: Value,
}

/// Persist a `running` row, walk the graph from `start_node_id` (or the
/// compiled entry if `None`), then persist the terminal row. Used by
/// [`Runtime::execute`], [`Runtime::resume`], and the `subworkflow` node
/// executor (`crate::nodes::subworkflow`) alike — every one of them is, from
/// this function's point of view, just "run this graph from here".
pub async fn run_graph(
    runtime: &Runtime,
    graph: &WorkflowGraph,
    execution_id: Uuid,
    workflow_name: &str,
    parent_execution_id: Option<Uuid>,
    start_node_id: Option<String>,
    state: Value,
) -> Result<ExecutionSnapshot, EngineError> {
    let now = Utc::now().to_rfc3339();
    let graph_json = serde_json::to_string(graph).unwrap_or_else(|_| "{}".into());

    let mut row = WorkflowExecutionRow {
        id: execution_id.to_string(),
        workflow_name: workflow_name.to_string(),
        status: "running".into(),
        current_node_id: start_node_id.clone(),
        state_data: serde_json::to_string(&state).unwrap_or_else(|_| "{}".into()),
        graph_json,
        parent_execution_id: parent_execution_id.map(|id| id.to_string()),
        created_at: now.clone(),
        updated_at: now,
    };
    runtime.ledger.upsert_workflow_execution(&row).await?;

    let outcome = walk(runtime, graph, execution_id, start_node_id, state).await;

    row.status = outcome.status.clone();
    row.current_node_id = outcome.current_node_id.clone();
    row.state_data = serde_json::to_string(&outcome.state).unwrap_or_else(|_| "{}".into());
    row.updated_at = Utc::now().to_rfc3339();
    runtime.ledger.upsert_workflow_execution(&row).await?;

    info!(execution_id = %execution_id, status = %outcome.status, "execution settled");

    Ok(ExecutionSnapshot {
        execution_id,
        status: outcome.status,
        current_node_id: outcome.current_node_id,
        state: outcome.state,
    })
}

async fn walk(
    runtime: &Runtime,
    graph: &WorkflowGraph,
    execution_id: Uuid,
    start_node_id: Option<String>,
    mut state: Value,
) -> WalkOutcome {
    let compiled = match compiler::compile(graph, execution_id, runtime) {
        Ok(c) => c,
        Err(e) => {
            insert_error(&mut state, &e.to_string());
            return WalkOutcome { status: "failed".into(), current_node_id: None, state };
        }
    };

    let mut current = start_node_id.or_else(|| compiled.entry.clone());
    let ctx = ExecutionContext { execution_id };
    let mut steps: u64 = 0;

    while let Some(node_id) = current {
        steps += 1;
        if steps > runtime.max_steps {
            warn!(execution_id = %execution_id, max_steps = runtime.max_steps, "step budget exceeded");
            insert_error(&mut state, &EngineError::StepBudgetExceeded { max_steps: runtime.max_steps }.to_string());
            return WalkOutcome { status: "failed".into(), current_node_id: Some(node_id), state };
        }

        let Some(executor) = compiled.executors.get(&node_id) else {
            // Edge pointed at a node id absent from this graph — treat the
            // branch as exhausted rather than crashing the workflow.
            warn!(execution_id = %execution_id, node_id, "routed to an unknown node id, stopping here");
            break;
        };

        state = match executor.execute(state, &ctx).await {
            Ok(s) => s,
            Err(e) => {
                warn!(execution_id = %execution_id, node_id, error = %e, "node executor returned an error");
                insert_error(&mut state, &e.to_string());
                return WalkOutcome { status: "failed".into(), current_node_id: Some(node_id), state };
            }
        };

        if state.get("_paused_at_form").is_some() {
            return WalkOutcome { status: "paused".into(), current_node_id: Some(node_id), state };
        }

        current = route(compiled.routers.get(&node_id), &state);
    }

    WalkOutcome { status: "completed".into(), current_node_id: None, state }
}

fn insert_error(state: &mut Value, message: &str) {
    if let Some(obj) = state.as_object_mut() {
        obj.insert("_error".into(), json!({ "message": message }));
    }
}
