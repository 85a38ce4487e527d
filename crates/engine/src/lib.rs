//! `engine` crate — graph models, the compiler, the node executors, and the
//! interpreter that walks compiled graphs (spec §4).

pub mod compiler;
pub mod error;
pub mod models;
pub mod nodes;
pub mod runtime;

pub use compiler::{compile, route, validate_graph, CompiledGraph, NodeFactory, Router};
pub use error::EngineError;
pub use models::{Edge, NodeDefinition, WorkflowGraph};
pub use runtime::{run_graph, ExecutionSnapshot, Runtime};

#[cfg(test)]
mod scenario_tests;
