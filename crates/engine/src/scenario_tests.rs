//! End-to-end scenario tests against a real `Runtime` backed by the real
//! `SqliteLedger` (pointed at `sqlite::memory:`, per SPEC_FULL.md §8), plus
//! a `wiremock` server for the two scenarios that need outbound HTTP
//! ("mocked HTTP echoes its body back"). These exercise the concrete
//! scenarios S1-S6 end to end rather than single-node unit behavior, which
//! the per-executor modules already cover.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use db::{Ledger, SqliteLedger};

use crate::models::{Edge, NodeDefinition, WorkflowGraph};
use crate::runtime::Runtime;

/// A fresh `Runtime` over an in-memory SQLite ledger, migrated and ready.
/// `max_connections(1)` keeps every query on the same connection — SQLite's
/// `:memory:` database is otherwise private per connection.
async fn test_runtime() -> Runtime {
    let pool = db::pool::create_pool("sqlite::memory:", 1).await.expect("in-memory pool");
    db::pool::run_migrations(&pool).await.expect("migrations");
    Runtime::new(Arc::new(SqliteLedger::new(pool)))
}

fn service_node(id: &str, url: &str, request: serde_json::Value) -> NodeDefinition {
    NodeDefinition { id: id.into(), kind: "service".into(), data: json!({ "url": url, "request": request }) }
}

fn edge(source: &str, target: &str) -> Edge {
    Edge { source: source.into(), target: target.into(), condition: None }
}

fn cond_edge(source: &str, target: &str, condition: &str) -> Edge {
    Edge { source: source.into(), target: target.into(), condition: Some(condition.into()) }
}

#[tokio::test]
async fn s1_linear_service_chain_threads_state_between_nodes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "v": "hi" })))
        .mount(&server)
        .await;

    let graph = WorkflowGraph {
        nodes: vec![
            service_node("A", &server.uri(), json!({ "v": "{input.v}" })),
            service_node("B", &server.uri(), json!({ "prev": "{A.response.v}" })),
        ],
        edges: vec![edge("A", "B")],
    };

    let runtime = test_runtime().await;
    let snapshot = runtime.execute(graph, json!({ "v": "hi" }), "s1").await.unwrap();

    assert_eq!(snapshot.status, "completed");
    assert_eq!(snapshot.state["A"]["response"]["v"], json!("hi"));
    assert_eq!(snapshot.state["B"]["request"]["prev"], json!("hi"));

    let rows = runtime.ledger.list_node_executions(&snapshot.execution_id.to_string()).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.status == "completed"));
}

#[tokio::test]
async fn node_execution_records_carry_the_graphs_label_or_fall_back_to_the_node_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200).set_body_json(json!({}))).mount(&server).await;

    let graph = WorkflowGraph {
        nodes: vec![
            NodeDefinition {
                id: "A".into(),
                kind: "service".into(),
                data: json!({ "label": "Call pricing API", "url": server.uri() }),
            },
            NodeDefinition { id: "B".into(), kind: "decision".into(), data: json!({ "rules": [] }) },
        ],
        edges: vec![edge("A", "B")],
    };

    let runtime = test_runtime().await;
    let snapshot = runtime.execute(graph, json!({}), "labels").await.unwrap();

    let rows = runtime.ledger.list_node_executions(&snapshot.execution_id.to_string()).await.unwrap();
    let a_row = rows.iter().find(|r| r.node_id == "A").unwrap();
    let b_row = rows.iter().find(|r| r.node_id == "B").unwrap();
    assert_eq!(a_row.node_label.as_deref(), Some("Call pricing API"));
    assert_eq!(b_row.node_label.as_deref(), Some("B"));
}

#[tokio::test]
async fn s2_conditional_routing_picks_first_true_else_fallback() {
    let decision = NodeDefinition {
        id: "A".into(),
        kind: "decision".into(),
        data: json!({
            "rules": [
                {"condition": "input.n > 0", "action": {"sign": "pos"}},
                {"condition": "input.n < 0", "action": {"sign": "neg"}},
            ]
        }),
    };
    let graph = WorkflowGraph {
        nodes: vec![
            decision,
            NodeDefinition { id: "B".into(), kind: "decision".into(), data: json!({ "rules": [] }) },
            NodeDefinition { id: "C".into(), kind: "decision".into(), data: json!({ "rules": [] }) },
            NodeDefinition { id: "D".into(), kind: "decision".into(), data: json!({ "rules": [] }) },
        ],
        edges: vec![
            cond_edge("A", "B", "state.sign == 'pos'"),
            cond_edge("A", "C", "state.sign == 'neg'"),
            edge("A", "D"),
        ],
    };

    let runtime = test_runtime().await;

    let zero = runtime.execute(graph.clone(), json!({ "n": 0 }), "s2").await.unwrap();
    assert!(zero.state.get("sign").is_none());

    let positive = runtime.execute(graph, json!({ "n": 5 }), "s2").await.unwrap();
    assert_eq!(positive.state["sign"], json!("pos"));
}

#[tokio::test]
async fn s3_pause_and_resume_carries_form_data_into_the_next_node() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let graph = WorkflowGraph {
        nodes: vec![
            service_node("A", &server.uri(), json!({})),
            NodeDefinition { id: "F".into(), kind: "form".into(), data: json!({ "schema": {"type": "object"} }) },
            service_node("B", &server.uri(), json!({ "echoed_x": "{F.form_data.x}" })),
        ],
        edges: vec![edge("A", "F"), edge("F", "B")],
    };

    let runtime = test_runtime().await;

    let paused = runtime.execute(graph, json!({}), "s3").await.unwrap();
    assert_eq!(paused.status, "paused");
    assert_eq!(paused.state["_paused_at_form"]["node_id"], json!("F"));

    let resumed = runtime.resume(paused.execution_id, json!({ "x": "42" })).await.unwrap();
    assert_eq!(resumed.status, "completed");
    assert_eq!(resumed.state["B"]["request"]["echoed_x"], json!("42"));

    let execution_id = paused.execution_id.to_string();
    let f_records: Vec<_> = runtime
        .ledger
        .list_node_executions(&execution_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.node_id == "F")
        .map(|r| r.status)
        .collect();
    assert_eq!(f_records, vec!["paused".to_string(), "completed".to_string()]);
}

#[tokio::test]
async fn s3_resume_on_a_non_paused_execution_is_rejected() {
    let runtime = test_runtime().await;
    let graph = WorkflowGraph {
        nodes: vec![NodeDefinition { id: "d".into(), kind: "decision".into(), data: json!({ "rules": [] }) }],
        edges: vec![],
    };
    let completed = runtime.execute(graph, json!({}), "s3b").await.unwrap();
    let err = runtime.resume(completed.execution_id, json!({})).await.unwrap_err();
    assert!(matches!(err, crate::EngineError::NotPaused(_, status) if status == "completed"));
}

#[tokio::test]
async fn s4_service_failure_is_recorded_but_does_not_abort_the_workflow() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(500).set_body_string("boom")).mount(&server).await;

    let graph = WorkflowGraph {
        nodes: vec![
            service_node("A", &server.uri(), json!({})),
            NodeDefinition {
                id: "B".into(),
                kind: "decision".into(),
                data: json!({ "rules": [{"condition": "'error' in state.A.response", "action": {"fallback": true}}] }),
            },
        ],
        edges: vec![edge("A", "B")],
    };

    let runtime = test_runtime().await;
    let snapshot = runtime.execute(graph, json!({}), "s4").await.unwrap();

    assert_eq!(snapshot.status, "completed");
    assert_eq!(snapshot.state["fallback"], json!(true));

    let rows = runtime.ledger.list_node_executions(&snapshot.execution_id.to_string()).await.unwrap();
    let a_record = rows.iter().find(|r| r.node_id == "A").unwrap();
    assert_eq!(a_record.status, "failed");

    let metric = runtime.ledger.get_service_metric("A").await.unwrap();
    assert_eq!(metric.total_calls, 1);
    assert_eq!(metric.successes, 0);
    assert_eq!(metric.failures, 1);
}

#[tokio::test]
async fn s5_subworkflow_links_child_execution_to_parent() {
    let child_graph = WorkflowGraph {
        nodes: vec![
            NodeDefinition { id: "A".into(), kind: "decision".into(), data: json!({ "rules": [] }) },
            NodeDefinition { id: "B".into(), kind: "decision".into(), data: json!({ "rules": [] }) },
        ],
        edges: vec![edge("A", "B")],
    };
    let graph = WorkflowGraph {
        nodes: vec![NodeDefinition {
            id: "S".into(),
            kind: "subworkflow".into(),
            data: json!({ "graph": child_graph }),
        }],
        edges: vec![],
    };

    let runtime = test_runtime().await;
    let snapshot = runtime.execute(graph, json!({}), "s5").await.unwrap();

    assert_eq!(snapshot.status, "completed");
    let child_id = snapshot.state["S"]["sub_execution_id"].as_str().unwrap().to_string();

    let child_row = runtime.ledger.get_workflow_execution(&child_id).await.unwrap();
    assert_eq!(child_row.parent_execution_id.as_deref(), Some(snapshot.execution_id.to_string().as_str()));

    let all = runtime.ledger.list_recent_executions(10).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn s6_template_resilience_leaves_unresolvable_placeholders_untouched() {
    let rendered = expr::render_template(
        &json!("hello {missing.path} {input.name}"),
        &json!({ "input": { "name": "Ada" } }),
    );
    assert_eq!(rendered, json!("hello {missing.path} Ada"));
}
