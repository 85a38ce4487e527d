//! Service node executor (spec §4.D): calls out to an HTTP endpoint,
//! templating and mapping its payload from the current state first.

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

fn default_method() -> String {
    "POST".into()
}

/// One `mappings[]` entry: pull `source` out of state, optionally
/// transform it, and assign it into the outgoing payload at `target`.
#[derive(Debug, Clone, Deserialize)]
struct Mapping {
    source: String,
    target: String,
    #[serde(default)]
    transform: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ServiceConfig {
    #[serde(default)]
    url: String,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    request: Value,
    #[serde(default)]
    mappings: Vec<Mapping>,
}

pub struct ServiceNode {
    node_id: String,
    label: String,
    config: ServiceConfig,
    runtime: Runtime,
}

impl ServiceNode {
    pub fn new(node_id: String, label: String, data: Value, _execution_id: Uuid, runtime: Runtime) -> Self {
        let config = serde_json::from_value(data).unwrap_or_else(|e| {
            warn!(node_id = %node_id, error = %e, "invalid service node config, node will fail every call");
            ServiceConfig { url: String::new(), method: default_method(), request: Value::Null, mappings: vec![] }
        });
        Self { node_id, label, config, runtime }
    }
}

/// Resolve each mapping's `source` against `state` and write it into
/// `payload` at the dotted `target` path, creating nested objects as
/// needed — mirrors the original implementation's
/// `if p not in sub or not isinstance(sub[p], dict): sub[p] = {}` (spec §9
/// open question 1, resolved).
fn apply_mappings(payload: &mut Value, state: &Value, mappings: &[Mapping]) {
    for mapping in mappings {
        let Some(resolved) = expr::deep_get(state, &mapping.source) else { continue };
        let mut value = resolved.clone();
        if let (Some(transform), Value::String(s)) = (&mapping.transform, &value) {
            value = Value::String(match transform.as_str() {
                "upper" => s.to_uppercase(),
                "lower" => s.to_lowercase(),
                "strip" => s.trim().to_string(),
                _ => s.clone(),
            });
        }
        set_dotted(payload, &mapping.target, value);
    }
}

fn set_dotted(root: &mut Value, path: &str, value: Value) {
    let parts: Vec<&str> = path.split('.').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return;
    }

    let mut current = root;
    for part in &parts[..parts.len() - 1] {
        if !current.is_object() {
            *current = json!({});
        }
        current = current
            .as_object_mut()
            .unwrap()
            .entry(part.to_string())
            .or_insert_with(|| json!({}));
        if !current.is_object() {
            *current = json!({});
        }
    }

    if !current.is_object() {
        *current = json!({});
    }
    current
        .as_object_mut()
        .unwrap()
        .insert(parts[parts.len() - 1].to_string(), value);
}

#[async_trait]
impl ExecutableNode for ServiceNode {
    async fn execute(&self, mut state: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let started_at = Utc::now();

        let mut payload = expr::render_template(&self.config.request, &state);
        apply_mappings(&mut payload, &state, &self.config.mappings);

        let method = reqwest::Method::from_bytes(self.config.method.to_uppercase().as_bytes())
            .unwrap_or(reqwest::Method::POST);

        let clock = std::time::Instant::now();
        let outcome = self
            .runtime
            .http
            .request(method, &self.config.url)
            .json(&payload)
            .send()
            .await;

        let (response, success, error_message) = match outcome {
            Ok(resp) => {
                let status_ok = resp.status().is_success();
                match resp.text().await {
                    Ok(body) if status_ok => {
                        let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::String(body));
                        (parsed, true, None)
                    }
                    Ok(body) => (json!({ "error": body.clone() }), false, Some(body)),
                    Err(e) => (json!({ "error": e.to_string() }), false, Some(e.to_string())),
                }
            }
            Err(e) => (json!({ "error": e.to_string() }), false, Some(e.to_string())),
        };
        let elapsed_ms = clock.elapsed().as_millis() as i64;

        if let Err(e) = self.runtime.ledger.update_service_metric(&self.node_id, success, elapsed_ms as f64).await {
            warn!(node_id = %self.node_id, error = %e, "failed to update service metrics");
        }

        let record = NodeExecutionRow {
            id: Uuid::new_v4().to_string(),
            workflow_execution_id: ctx.execution_id.to_string(),
            node_id: self.node_id.clone(),
            node_type: "service".into(),
            node_label: Some(self.label.clone()),
            status: if success { "completed".into() } else { "failed".into() },
            request_data: Some(payload.to_string()),
            response_data: Some(response.to_string()),
            error_message,
            execution_time_ms: Some(elapsed_ms),
            started_at: started_at.to_rfc3339(),
            completed_at: Some(Utc::now().to_rfc3339()),
        };
        if let Err(e) = self.runtime.ledger.append_node_execution(&record).await {
            warn!(node_id = %self.node_id, error = %e, "failed to persist service node execution record");
        }

        if let Some(obj) = state.as_object_mut() {
            obj.insert(
                self.node_id.clone(),
                json!({
                    "request": payload,
                    "response": response,
                    "_metrics": { "last_exec_ms": elapsed_ms, "success": success },
                }),
            );
        }

        Ok(state)
    }
}
