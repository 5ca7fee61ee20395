// src/dag/readiness.rs

//! Readiness of a candidate node given its predecessors' outcomes.
//!
//! [`classify`] is a pure inspection; [`evaluate`] applies the forced
//! `Cancel`/`Skipped` transition to the candidate. That transition is the
//! only mechanism by which cancellation and skips propagate downstream.

use tracing::{debug, warn};

use crate::dag::graph::ExecutionGraph;
use crate::dag::node::{Node, NodeStatus};
use crate::errors::NodeError;

/// What the predecessors of a candidate allow it to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Every predecessor resolved in a way the candidate may proceed past.
    Ready,
    /// Some predecessor is still pending or running; check again later.
    Wait,
    /// The candidate must be cancelled. Upstream failure carries a reason;
    /// upstream cancellation propagates silently.
    Cancel(Option<NodeError>),
    /// The candidate must be skipped.
    Skip(NodeError),
}

/// Classify `node` against its predecessors without touching any state.
///
/// The first decisive predecessor in edge order wins when several have
/// non-success outcomes.
pub fn classify(graph: &ExecutionGraph, node: &Node) -> Readiness {
    let mut waiting = false;

    for &dep in graph.predecessors(node.id()) {
        let Some(pred) = graph.node(dep) else {
            warn!(step = %node.name(), dep, "predecessor id missing from graph");
            return Readiness::Wait;
        };

        match pred.status() {
            NodeStatus::Success => {}
            NodeStatus::Error if pred.step().continue_on.failure => {}
            NodeStatus::Error => {
                return Readiness::Cancel(Some(NodeError::UpstreamFailed));
            }
            NodeStatus::Skipped if pred.step().continue_on.skipped => {}
            NodeStatus::Skipped => {
                return Readiness::Skip(NodeError::UpstreamSkipped);
            }
            NodeStatus::Cancel => {
                return Readiness::Cancel(None);
            }
            NodeStatus::NotStarted | NodeStatus::Running => {
                waiting = true;
            }
        }
    }

    if waiting {
        Readiness::Wait
    } else {
        Readiness::Ready
    }
}

/// Apply the classification's forced transition, if any, and report
/// whether the node may start now.
pub fn evaluate(graph: &ExecutionGraph, node: &Node) -> bool {
    match classify(graph, node) {
        Readiness::Ready => true,
        Readiness::Wait => false,
        Readiness::Cancel(error) => {
            debug!(step = %node.name(), "cancelling step due to upstream outcome");
            node.update_status(NodeStatus::Cancel);
            if let Some(error) = error {
                node.set_error(error);
            }
            false
        }
        Readiness::Skip(error) => {
            debug!(step = %node.name(), "skipping step due to upstream outcome");
            node.update_status(NodeStatus::Skipped);
            node.set_error(error);
            false
        }
    }
}
