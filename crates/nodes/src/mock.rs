//! `MockNode` — a test double for `ExecutableNode`.
//!
//! Useful in unit and integration tests where a real node executor is
//! either unavailable or irrelevant.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::{traits::ExecutionContext, ExecutableNode, NodeError};

/// Behaviour injected into `MockNode` at construction time.
pub enum MockBehaviour {
    /// Store this value at `state[name]` and return the updated state.
    ReturnValue(Value),
    /// Fail with the given message.
    Fail(String),
}

/// A mock node that records every state it receives and either stores a
/// programmer-specified value under its own key or fails.
pub struct MockNode {
    /// Used both for test assertions and as the `state` key written on
    /// success.
    pub name: String,
    pub behaviour: MockBehaviour,
    /// All states seen by this node (in call order).
    pub calls: Arc<Mutex<Vec<Value>>>,
}

impl MockNode {
    /// Create a mock that always succeeds, writing `value` to `state[name]`.
    pub fn returning(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            behaviour: MockBehaviour::ReturnValue(value),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always fails with the given message.
    pub fn failing(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behaviour: MockBehaviour::Fail(msg.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of times this node has been executed.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ExecutableNode for MockNode {
    async fn execute(&self, state: Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        self.calls.lock().unwrap().push(state.clone());

        match &self.behaviour {
            MockBehaviour::ReturnValue(v) => {
                let mut out = state;
                if let Some(obj) = out.as_object_mut() {
                    obj.insert(self.name.clone(), v.clone());
                }
                Ok(out)
            }
            MockBehaviour::Fail(msg) => Err(NodeError::new(msg.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ExecutionContext;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn returning_node_writes_its_own_key() {
        let node = MockNode::returning("A", json!({"ok": true}));
        let ctx = ExecutionContext { execution_id: Uuid::new_v4() };
        let out = node.execute(json!({}), &ctx).await.unwrap();
        assert_eq!(out["A"], json!({"ok": true}));
        assert_eq!(node.call_count(), 1);
    }

    #[tokio::test]
    async fn failing_node_returns_error() {
        let node = MockNode::failing("B", "boom");
        let ctx = ExecutionContext { execution_id: Uuid::new_v4() };
        let err = node.execute(json!({}), &ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
