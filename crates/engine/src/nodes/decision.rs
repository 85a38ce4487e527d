//! Decision node executor (spec §4.D): evaluates rules and an optional
//! trusted `script` against the current state. Never fails the workflow —
//! evaluation errors are swallowed inside `expr::eval_bool`/`eval_script`.

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
struct Rule {
    condition: String,
    #[serde(default)]
    action: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct DecisionConfig {
    #[serde(default)]
    rules: Vec<Rule>,
    #[serde(default)]
    script: Option<String>,
}

pub struct DecisionNode {
    node_id: String,
    label: String,
    config: DecisionConfig,
    runtime: Runtime,
}

impl DecisionNode {
    pub fn new(node_id: String, label: String, data: Value, _execution_id: Uuid, runtime: Runtime) -> Self {
        let config = serde_json::from_value(data).unwrap_or_else(|e| {
            warn!(node_id = %node_id, error = %e, "invalid decision node config, no rules will fire");
            DecisionConfig { rules: vec![], script: None }
        });
        Self { node_id, label, config, runtime }
    }
}

/// Merge `action`'s top-level keys into `state`, last rule wins.
fn merge_action(state: &mut Value, action: &Value) {
    if let (Some(state_obj), Some(action_obj)) = (state.as_object_mut(), action.as_object()) {
        for (k, v) in action_obj {
            state_obj.insert(k.clone(), v.clone());
        }
    }
}

#[async_trait]
impl ExecutableNode for DecisionNode {
    async fn execute(&self, state: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let started_at = Utc::now();
        let mut working = state;
        let mut actions_taken = Vec::new();

        for rule in &self.config.rules {
            if expr::eval_bool(&rule.condition, &working) {
                merge_action(&mut working, &rule.action);
                actions_taken.push(json!({ "condition": rule.condition, "action": rule.action }));
            }
        }

        if let Some(script) = &self.config.script {
            working = expr::eval_script(script, &working);
        }

        let record = NodeExecutionRow {
            id: Uuid::new_v4().to_string(),
            workflow_execution_id: ctx.execution_id.to_string(),
            node_id: self.node_id.clone(),
            node_type: "decision".into(),
            node_label: Some(self.label.clone()),
            status: "completed".into(),
            request_data: None,
            response_data: Some(json!({ "actions": actions_taken }).to_string()),
            error_message: None,
            execution_time_ms: None,
            started_at: started_at.to_rfc3339(),
            completed_at: Some(Utc::now().to_rfc3339()),
        };
        if let Err(e) = self.runtime.ledger.append_node_execution(&record).await {
            warn!(node_id = %self.node_id, error = %e, "failed to persist decision node execution record");
        }

        Ok(working)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::ledger::Ledger;
    use std::sync::Arc;

    struct RecordingLedger {
        rows: std::sync::Mutex<Vec<NodeExecutionRow>>,
    }

    #[async_trait]
    impl Ledger for RecordingLedger {
        async fn upsert_workflow_execution(&self, _: &db::models::WorkflowExecutionRow) -> Result<(), db::DbError> { Ok(()) }
        async fn get_workflow_execution(&self, _: &str) -> Result<db::models::WorkflowExecutionRow, db::DbError> { Err(db::DbError::NotFound) }
        async fn list_recent_executions(&self, _: i64) -> Result<Vec<db::models::WorkflowExecutionRow>, db::DbError> { Ok(vec![]) }
        async fn append_node_execution(&self, r: &NodeExecutionRow) -> Result<String, db::DbError> {
            self.rows.lock().unwrap().push(r.clone());
            Ok(r.id.clone())
        }
        async fn list_node_executions(&self, _: &str) -> Result<Vec<NodeExecutionRow>, db::DbError> { Ok(vec![]) }
        async fn append_form_response(&self, _: &db::models::FormResponseRow) -> Result<(), db::DbError> { Ok(()) }
        async fn update_service_metric(&self, _: &str, _: bool, _: f64) -> Result<(), db::DbError> { Ok(()) }
        async fn get_service_metric(&self, _: &str) -> Result<db::models::ServiceMetricRow, db::DbError> { Err(db::DbError::NotFound) }
    }

    #[tokio::test]
    async fn first_matching_rule_wins_on_overlapping_keys() {
        let ledger = Arc::new(RecordingLedger { rows: std::sync::Mutex::new(vec![]) });
        let runtime = Runtime::new(ledger.clone());
        let node = DecisionNode::new(
            "d1".into(),
            "Sign check".into(),
            json!({
                "rules": [
                    {"condition": "input.n > 0", "action": {"sign": "pos"}},
                    {"condition": "input.n < 0", "action": {"sign": "neg"}},
                ]
            }),
            Uuid::new_v4(),
            runtime,
        );
        let ctx = ExecutionContext { execution_id: Uuid::new_v4() };
        let out = node.execute(json!({ "input": { "n": 5 } }), &ctx).await.unwrap();
        assert_eq!(out["sign"], json!("pos"));
        let rows = ledger.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].node_label.as_deref(), Some("Sign check"));
    }

    #[tokio::test]
    async fn script_runs_after_rules_and_replaces_state() {
        let ledger = Arc::new(RecordingLedger { rows: std::sync::Mutex::new(vec![]) });
        let runtime = Runtime::new(ledger);
        let node = DecisionNode::new(
            "d1".into(),
            "d1".into(),
            json!({ "rules": [], "script": "state.computed = 1 + 1" }),
            Uuid::new_v4(),
            runtime,
        );
        let ctx = ExecutionContext { execution_id: Uuid::new_v4() };
        let out = node.execute(json!({}), &ctx).await.unwrap();
        assert_eq!(out["computed"], json!(2.0));
    }
}
