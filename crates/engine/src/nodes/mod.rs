//! Concrete node executors (spec §4.D). These live in `engine`, not the
//! leaf `nodes` crate: `subworkflow` must recursively invoke
//! `crate::runtime::run_graph`, and putting the executors here avoids a
//! cyclic `nodes ↔ engine` dependency while keeping the `ExecutableNode`
//! trait itself in the leaf crate.

pub mod decision;
pub mod form;
pub mod service;
pub mod subworkflow;
