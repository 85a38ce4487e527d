//! Form node executor (spec §4.D): pauses the workflow for external input.
//! Never resolves on its own — `Runtime::resume` is the only way past it.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use db::models::NodeExecutionRow;
use nodes::traits::ExecutionContext;
use nodes::{ExecutableNode, NodeError};

use crate::runtime::Runtime;

#[derive(Debug, Clone, Deserialize)]
struct FormConfig {
    #[serde(default)]
    schema: Value,
}

pub struct FormNode {
    node_id: String,
    label: String,
    config: FormConfig,
    runtime: Runtime,
}

impl FormNode {
    pub fn new(node_id: String, label: String, data: Value, _execution_id: Uuid, runtime: Runtime) -> Self {
        let config = serde_json::from_value(data).unwrap_or_else(|e| {
            warn!(node_id = %node_id, error = %e, "invalid form node config, using an empty schema");
            FormConfig { schema: Value::Null }
        });
        Self { node_id, label, config, runtime }
    }
}

#[async_trait]
impl ExecutableNode for FormNode {
    async fn execute(&self, mut state: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let now = Utc::now().to_rfc3339();

        let record = NodeExecutionRow {
            id: Uuid::new_v4().to_string(),
            workflow_execution_id: ctx.execution_id.to_string(),
            node_id: self.node_id.clone(),
            node_type: "form".into(),
            node_label: Some(self.label.clone()),
            status: "paused".into(),
            request_data: Some(self.config.schema.to_string()),
            response_data: None,
            error_message: None,
            execution_time_ms: None,
            started_at: now,
            completed_at: None,
        };
        if let Err(e) = self.runtime.ledger.append_node_execution(&record).await {
            warn!(node_id = %self.node_id, error = %e, "failed to persist form node pause record");
        }

        if let Some(obj) = state.as_object_mut() {
            obj.insert(
                "_paused_at_form".into(),
                json!({
                    "node_id": self.node_id,
                    "execution_id": ctx.execution_id.to_string(),
                    "form_schema": self.config.schema,
                }),
            );
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::ledger::Ledger;
    use std::sync::Arc;

    struct NullLedger;
    #[async_trait]
    impl Ledger for NullLedger {
        async fn upsert_workflow_execution(&self, _: &db::models::WorkflowExecutionRow) -> Result<(), db::DbError> { Ok(()) }
        async fn get_workflow_execution(&self, _: &str) -> Result<db::models::WorkflowExecutionRow, db::DbError> { Err(db::DbError::NotFound) }
        async fn list_recent_executions(&self, _: i64) -> Result<Vec<db::models::WorkflowExecutionRow>, db::DbError> { Ok(vec![]) }
        async fn append_node_execution(&self, r: &NodeExecutionRow) -> Result<String, db::DbError> { Ok(r.id.clone()) }
        async fn list_node_executions(&self, _: &str) -> Result<Vec<NodeExecutionRow>, db::DbError> { Ok(vec![]) }
        async fn append_form_response(&self, _: &db::models::FormResponseRow) -> Result<(), db::DbError> { Ok(()) }
        async fn update_service_metric(&self, _: &str, _: bool, _: f64) -> Result<(), db::DbError> { Ok(()) }
        async fn get_service_metric(&self, _: &str) -> Result<db::models::ServiceMetricRow, db::DbError> { Err(db::DbError::NotFound) }
    }

    #[tokio::test]
    async fn execute_marks_state_paused_at_this_node() {
        let runtime = Runtime::new(Arc::new(NullLedger));
        let node = FormNode::new("approval".into(), "Approval".into(), json!({ "schema": {"type": "object"} }), Uuid::new_v4(), runtime);
        let ctx = ExecutionContext { execution_id: Uuid::new_v4() };
        let out = node.execute(json!({ "input": {} }), &ctx).await.unwrap();
        assert_eq!(out["_paused_at_form"]["node_id"], json!("approval"));
    }
}
