//! Graph Compiler (spec §4.E) — turns a [`WorkflowGraph`] plus the owning
//! execution id into a [`CompiledGraph`]: one executor per node id, and one
//! router per node id that have outgoing edges.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use nodes::ExecutableNode;

use crate::models::{Edge, NodeDefinition, WorkflowGraph};
use crate::nodes::{decision::DecisionNode, form::FormNode, service::ServiceNode, subworkflow::SubworkflowNode};
use crate::runtime::Runtime;
use crate::EngineError;

/// A source node's successor policy, resolved at compile time (spec §9:
/// "the router is a plain closure over the edge list, not memoized" — here
/// that's [`route`], called fresh on every visit so back-edges re-evaluate
/// conditions each time).
pub enum Router {
    /// At least one outgoing edge carries a `condition`. Evaluated in
    /// document order; the first true condition wins, else the first
    /// unconditional edge, else no successor.
    Conditional(Vec<(Option<String>, String)>),
    /// No outgoing edge carries a condition — take the first (only,
    /// normally) target in document order.
    Plain(Vec<String>),
}

/// A factory function: builds one executor for one node definition, closing
/// over the owning execution id and the shared runtime (spec §9: "the
/// factory registry is a mapping from tag to factory").
pub type NodeFactory = fn(&NodeDefinition, Uuid, &Runtime) -> Arc<dyn ExecutableNode>;

fn default_registry() -> HashMap<&'static str, NodeFactory> {
    let mut registry: HashMap<&'static str, NodeFactory> = HashMap::new();
    registry.insert("service", |node, execution_id, runtime| {
        Arc::new(ServiceNode::new(node.id.clone(), node.label(), node.data.clone(), execution_id, runtime.clone()))
    });
    registry.insert("decision", |node, execution_id, runtime| {
        Arc::new(DecisionNode::new(node.id.clone(), node.label(), node.data.clone(), execution_id, runtime.clone()))
    });
    registry.insert("form", |node, execution_id, runtime| {
        Arc::new(FormNode::new(node.id.clone(), node.label(), node.data.clone(), execution_id, runtime.clone()))
    });
    registry.insert("subworkflow", |node, execution_id, runtime| {
        Arc::new(SubworkflowNode::new(node.id.clone(), node.label(), node.data.clone(), execution_id, runtime.clone()))
    });
    registry
}

/// A compiled, ready-to-walk graph.
pub struct CompiledGraph {
    pub entry: Option<String>,
    pub executors: HashMap<String, Arc<dyn ExecutableNode>>,
    pub routers: HashMap<String, Router>,
}

/// Compile `graph` for `execution_id`. Unknown node types are a fatal
/// compilation error (spec §4.E step 1); an empty node list is rejected
/// before any executor is built.
pub fn compile(graph: &WorkflowGraph, execution_id: Uuid, runtime: &Runtime) -> Result<CompiledGraph, EngineError> {
    if graph.nodes.is_empty() {
        return Err(EngineError::EmptyGraph);
    }

    let registry = default_registry();
    let mut executors = HashMap::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        let factory = registry
            .get(node.kind.as_str())
            .ok_or_else(|| EngineError::UnknownNodeType(node.kind.clone()))?;
        executors.insert(node.id.clone(), factory(node, execution_id, runtime));
    }

    let mut grouped: HashMap<&str, Vec<&Edge>> = HashMap::new();
    for edge in &graph.edges {
        grouped.entry(edge.source.as_str()).or_default().push(edge);
    }

    let mut routers = HashMap::with_capacity(grouped.len());
    for (source, edges) in grouped {
        let router = if edges.iter().any(|e| e.condition.is_some()) {
            Router::Conditional(edges.into_iter().map(|e| (e.condition.clone(), e.target.clone())).collect())
        } else {
            Router::Plain(edges.into_iter().map(|e| e.target.clone()).collect())
        };
        routers.insert(source.to_string(), router);
    }

    let entry = graph.nodes.first().map(|n| n.id.clone());

    Ok(CompiledGraph { entry, executors, routers })
}

/// Resolve the next node id for a source node's router against the current
/// state (spec §4.E routing semantics and tie-breaks). `None` means the
/// branch has no successor — traversal stops.
pub fn route(router: Option<&Router>, state: &Value) -> Option<String> {
    match router? {
        Router::Plain(targets) => targets.first().cloned(),
        Router::Conditional(edges) => {
            let mut fallback: Option<String> = None;
            for (condition, target) in edges {
                match condition {
                    Some(expr_src) => {
                        if expr::eval_bool(expr_src, state) {
                            return Some(target.clone());
                        }
                    }
                    None if fallback.is_none() => fallback = Some(target.clone()),
                    None => {}
                }
            }
            fallback
        }
    }
}

/// Structural validation only: known node kinds and edges that reference
/// existing node ids. Used by the `cli validate` subcommand, which checks a
/// graph file without spinning up a `Runtime` (no ledger, no HTTP client) —
/// compile() above additionally builds live executors and so needs one.
pub fn validate_graph(graph: &WorkflowGraph) -> Result<(), EngineError> {
    if graph.nodes.is_empty() {
        return Err(EngineError::EmptyGraph);
    }

    const KNOWN_KINDS: &[&str] = &["service", "decision", "form", "subworkflow"];
    let ids: std::collections::HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();

    for node in &graph.nodes {
        if !KNOWN_KINDS.contains(&node.kind.as_str()) {
            return Err(EngineError::UnknownNodeType(node.kind.clone()));
        }
    }
    for edge in &graph.edges {
        if !ids.contains(edge.source.as_str()) {
            return Err(EngineError::UnknownEdgeEndpoint(edge.source.clone()));
        }
        if !ids.contains(edge.target.as_str()) {
            return Err(EngineError::UnknownEdgeEndpoint(edge.target.clone()));
        }
    }
    Ok(())
}
