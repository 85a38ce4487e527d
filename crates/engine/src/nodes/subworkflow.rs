//! Subworkflow node executor (spec §4.D): runs a nested graph to completion
//! (or pause) using the same [`run_graph`] traversal as the top-level
//! entry points, linked back to its parent via `parent_execution_id`.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use db::models::NodeExecutionRow;
use nodes::traits::ExecutionContext;
use nodes::{ExecutableNode, NodeError};

use crate::models::WorkflowGraph;
use crate::runtime::{run_graph, Runtime};

#[derive(Debug, Clone, Deserialize)]
struct SubworkflowConfig {
    #[serde(default)]
    graph: Option<WorkflowGraph>,
    /// A prior execution id whose `graph_json` should be reloaded and
    /// re-executed — the alternative to an inline `graph` (spec §4.D).
    #[serde(default)]
    graph_ref: Option<String>,
    #[serde(default)]
    workflow_name: Option<String>,
}

pub struct SubworkflowNode {
    node_id: String,
    label: String,
    config: SubworkflowConfig,
    runtime: Runtime,
}

impl SubworkflowNode {
    pub fn new(node_id: String, label: String, data: Value, _execution_id: Uuid, runtime: Runtime) -> Self {
        let config = serde_json::from_value(data).unwrap_or_else(|e| {
            warn!(node_id = %node_id, error = %e, "invalid subworkflow node config, sub-execution will report an error");
            SubworkflowConfig { graph: None, graph_ref: None, workflow_name: None }
        });
        Self { node_id, label, config, runtime }
    }

    /// Resolve the child graph: an inline `graph` wins if present, else
    /// `graph_ref` is looked up in the ledger and its `graph_json` parsed.
    async fn resolve_graph(&self) -> Result<WorkflowGraph, String> {
        if let Some(graph) = &self.config.graph {
            return Ok(graph.clone());
        }
        let Some(graph_ref) = &self.config.graph_ref else {
            return Err("subworkflow node has neither a graph nor a graph_ref".into());
        };
        let row = self
            .runtime
            .ledger
            .get_workflow_execution(graph_ref)
            .await
            .map_err(|e| format!("graph_ref '{graph_ref}' not found: {e}"))?;
        serde_json::from_str(&row.graph_json)
            .map_err(|e| format!("graph_ref '{graph_ref}' carries an unparsable graph: {e}"))
    }
}

#[async_trait]
impl ExecutableNode for SubworkflowNode {
    async fn execute(&self, mut state: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let started_at = Utc::now();

        let graph = match self.resolve_graph().await {
            Ok(g) => g,
            Err(message) => {
                record_node_execution(&self.runtime, &self.node_id, &self.label, ctx.execution_id, "failed", Some(message.clone()), started_at).await;
                if let Some(obj) = state.as_object_mut() {
                    obj.insert(self.node_id.clone(), json!({ "error": message }));
                }
                return Ok(state);
            }
        };

        let child_execution_id = Uuid::new_v4();
        let child_input = state.get("input").cloned().unwrap_or(Value::Null);
        let child_state = json!({ "input": child_input });
        let workflow_name = self.config.workflow_name.as_deref().unwrap_or(&self.node_id);

        let result = run_graph(
            &self.runtime,
            &graph,
            child_execution_id,
            workflow_name,
            Some(ctx.execution_id),
            None,
            child_state,
        )
        .await;

        let (entry, node_status, error_message) = match result {
            Ok(snapshot) => {
                let status = if snapshot.status == "failed" { "failed" } else { "completed" };
                let entry = json!({
                    "sub_execution_id": child_execution_id.to_string(),
                    "status": snapshot.status,
                    "result": snapshot.state,
                });
                (entry, status, None)
            }
            Err(e) => (
                json!({ "sub_execution_id": child_execution_id.to_string(), "error": e.to_string() }),
                "failed",
                Some(e.to_string()),
            ),
        };

        record_node_execution(&self.runtime, &self.node_id, &self.label, ctx.execution_id, node_status, error_message, started_at).await;

        if let Some(obj) = state.as_object_mut() {
            obj.insert(self.node_id.clone(), entry);
        }

        Ok(state)
    }
}

async fn record_node_execution(
    runtime: &Runtime,
    node_id: &str,
    label: &str,
    execution_id: Uuid,
    status: &str,
    error_message: Option<String>,
    started_at: chrono::DateTime<Utc>,
) {
    let record = NodeExecutionRow {
        id: Uuid::new_v4().to_string(),
        workflow_execution_id: execution_id.to_string(),
        node_id: node_id.to_string(),
        node_type: "subworkflow".into(),
        node_label: Some(label.to_string()),
        status: status.into(),
        request_data: None,
        response_data: None,
        error_message,
        execution_time_ms: None,
        started_at: started_at.to_rfc3339(),
        completed_at: Some(Utc::now().to_rfc3339()),
    };
    if let Err(e) = runtime.ledger.append_node_execution(&record).await {
        warn!(node_id, error = %e, "failed to persist subworkflow node execution record");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeDefinition;
    use db::ledger::Ledger;
    use std::sync::{Arc, Mutex};

    struct RecordingLedger {
        executions: Mutex<std::collections::HashMap<String, db::models::WorkflowExecutionRow>>,
        node_executions: Mutex<Vec<NodeExecutionRow>>,
    }

    impl RecordingLedger {
        fn new() -> Self {
            Self { executions: Mutex::new(Default::default()), node_executions: Mutex::new(vec![]) }
        }
    }

    #[async_trait]
    impl Ledger for RecordingLedger {
        async fn upsert_workflow_execution(&self, r: &db::models::WorkflowExecutionRow) -> Result<(), db::DbError> {
            self.executions.lock().unwrap().insert(r.id.clone(), r.clone());
            Ok(())
        }
        async fn get_workflow_execution(&self, id: &str) -> Result<db::models::WorkflowExecutionRow, db::DbError> {
            self.executions.lock().unwrap().get(id).cloned().ok_or(db::DbError::NotFound)
        }
        async fn list_recent_executions(&self, _: i64) -> Result<Vec<db::models::WorkflowExecutionRow>, db::DbError> { Ok(vec![]) }
        async fn append_node_execution(&self, r: &NodeExecutionRow) -> Result<String, db::DbError> {
            self.node_executions.lock().unwrap().push(r.clone());
            Ok(r.id.clone())
        }
        async fn list_node_executions(&self, _: &str) -> Result<Vec<NodeExecutionRow>, db::DbError> { Ok(vec![]) }
        async fn append_form_response(&self, _: &db::models::FormResponseRow) -> Result<(), db::DbError> { Ok(()) }
        async fn update_service_metric(&self, _: &str, _: bool, _: f64) -> Result<(), db::DbError> { Ok(()) }
        async fn get_service_metric(&self, _: &str) -> Result<db::models::ServiceMetricRow, db::DbError> { Err(db::DbError::NotFound) }
    }

    #[tokio::test]
    async fn missing_graph_reports_error_without_failing_parent() {
        let ledger = Arc::new(RecordingLedger::new());
        let runtime = Runtime::new(ledger.clone());
        let node = SubworkflowNode::new("child".into(), "child".into(), json!({}), Uuid::new_v4(), runtime);
        let ctx = ExecutionContext { execution_id: Uuid::new_v4() };
        let out = node.execute(json!({ "input": {} }), &ctx).await.unwrap();
        assert!(out["child"]["error"].is_string());
        assert_eq!(ledger.node_executions.lock().unwrap()[0].status, "failed");
    }

    #[tokio::test]
    async fn nested_graph_runs_to_completion_and_links_to_parent() {
        let ledger = Arc::new(RecordingLedger::new());
        let runtime = Runtime::new(ledger.clone());
        let graph = WorkflowGraph {
            nodes: vec![NodeDefinition { id: "d".into(), kind: "decision".into(), data: json!({ "rules": [] }) }],
            edges: vec![],
        };
        let node = SubworkflowNode::new(
            "child".into(),
            "child".into(),
            json!({ "graph": graph, "workflow_name": "child-flow" }),
            Uuid::new_v4(),
            runtime,
        );
        let ctx = ExecutionContext { execution_id: Uuid::new_v4() };
        let out = node.execute(json!({ "input": {"x": 1} }), &ctx).await.unwrap();
        assert_eq!(out["child"]["status"], json!("completed"));
        assert_eq!(ledger.node_executions.lock().unwrap()[0].status, "completed");
    }

    #[tokio::test]
    async fn graph_ref_reloads_a_prior_executions_graph() {
        let ledger = Arc::new(RecordingLedger::new());
        let runtime = Runtime::new(ledger.clone());

        let prior_graph = WorkflowGraph {
            nodes: vec![NodeDefinition { id: "d".into(), kind: "decision".into(), data: json!({ "rules": [] }) }],
            edges: vec![],
        };
        let now = Utc::now().to_rfc3339();
        ledger
            .upsert_workflow_execution(&db::models::WorkflowExecutionRow {
                id: "prior-exec".into(),
                workflow_name: "prior".into(),
                status: "completed".into(),
                current_node_id: None,
                state_data: "{}".into(),
                graph_json: serde_json::to_string(&prior_graph).unwrap(),
                parent_execution_id: None,
                created_at: now.clone(),
                updated_at: now,
            })
            .await
            .unwrap();

        let node = SubworkflowNode::new("child".into(), "child".into(), json!({ "graph_ref": "prior-exec" }), Uuid::new_v4(), runtime);
        let ctx = ExecutionContext { execution_id: Uuid::new_v4() };
        let out = node.execute(json!({ "input": {} }), &ctx).await.unwrap();
        assert_eq!(out["child"]["status"], json!("completed"));
    }
}
