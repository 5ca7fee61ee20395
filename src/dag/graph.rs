// src/dag/graph.rs

//! Immutable execution graph over [`Node`]s.
//!
//! Dependencies are declared by name on each step; construction resolves
//! them to integer node ids and keeps both edge directions for lookup.
//! Unknown dependencies, self-dependencies, duplicate names and cycles are
//! rejected here, so the scheduler never re-checks the shape.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::node::Node;
use crate::errors::GraphError;

/// Run timestamps, set by the scheduler and read for status derivation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunTimestamps {
    pub started_at: Option<SystemTime>,
    pub finished_at: Option<SystemTime>,
}

#[derive(Debug)]
pub struct ExecutionGraph {
    nodes: Vec<Arc<Node>>,
    /// Direct dependencies, indexed by node id.
    predecessors: Vec<Vec<usize>>,
    /// Direct dependents, indexed by node id.
    successors: Vec<Vec<usize>>,
    timestamps: Mutex<RunTimestamps>,
}

impl ExecutionGraph {
    /// Build a graph from nodes, wiring edges from each step's `depends`.
    pub fn new(nodes: Vec<Node>) -> Result<Self, GraphError> {
        let mut ids: HashMap<String, usize> = HashMap::new();
        for (id, node) in nodes.iter().enumerate() {
            if ids.insert(node.name().to_string(), id).is_some() {
                return Err(GraphError::DuplicateName(node.name().to_string()));
            }
        }

        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

        for (id, node) in nodes.iter().enumerate() {
            for dep in &node.step().depends {
                let dep_id = *ids.get(dep).ok_or_else(|| GraphError::UnknownDependency {
                    step: node.name().to_string(),
                    dep: dep.clone(),
                })?;
                if dep_id == id {
                    return Err(GraphError::SelfDependency {
                        step: node.name().to_string(),
                    });
                }
                predecessors[id].push(dep_id);
                successors[dep_id].push(id);
            }
        }

        ensure_acyclic(&nodes, &predecessors)?;

        let nodes = nodes
            .into_iter()
            .enumerate()
            .map(|(id, mut node)| {
                node.id = id;
                Arc::new(node)
            })
            .collect();

        Ok(Self {
            nodes,
            predecessors,
            successors,
            timestamps: Mutex::new(RunTimestamps::default()),
        })
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> Option<&Arc<Node>> {
        self.nodes.get(id)
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Arc<Node>> {
        self.nodes.iter().find(|n| n.name() == name)
    }

    /// Ids of the nodes this node depends on.
    pub fn predecessors(&self, id: usize) -> &[usize] {
        self.predecessors.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids of the nodes depending on this node.
    pub fn successors(&self, id: usize) -> &[usize] {
        self.successors.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn timestamps(&self) -> MutexGuard<'_, RunTimestamps> {
        self.timestamps.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn run_timestamps(&self) -> RunTimestamps {
        *self.timestamps()
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.timestamps().started_at
    }

    pub fn finished_at(&self) -> Option<SystemTime> {
        self.timestamps().finished_at
    }

    pub(crate) fn set_started_at(&self, at: SystemTime) {
        self.timestamps().started_at = Some(at);
    }

    pub(crate) fn set_finished_at(&self, at: SystemTime) {
        self.timestamps().finished_at = Some(at);
    }
}

/// A topological sort fails exactly when there is a cycle.
fn ensure_acyclic(nodes: &[Node], predecessors: &[Vec<usize>]) -> Result<(), GraphError> {
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();

    for id in 0..nodes.len() {
        graph.add_node(id);
    }
    for (id, deps) in predecessors.iter().enumerate() {
        for &dep in deps {
            graph.add_edge(dep, id, ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let id = cycle.node_id();
            Err(GraphError::Cycle(nodes[id].name().to_string()))
        }
    }
}
