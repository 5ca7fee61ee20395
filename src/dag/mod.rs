// src/dag/mod.rs

//! DAG representation.
//!
//! - [`step`] defines steps and their policies.
//! - [`node`] binds a step to its runner capability and runtime state.
//! - [`graph`] holds the immutable dependency graph of nodes.
//! - [`readiness`] decides when a node may start and propagates
//!   cancel/skip outcomes downstream.

pub mod graph;
pub mod node;
pub mod readiness;
pub mod step;

pub use graph::{ExecutionGraph, RunTimestamps};
pub use node::{Node, NodeState, NodeStatus};
pub use readiness::Readiness;
pub use step::{ContinueOn, RepeatPolicy, RetryPolicy, Step};
