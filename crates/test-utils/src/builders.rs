#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use dagrun::conditions::Condition;
use dagrun::dag::{ExecutionGraph, Node, RepeatPolicy, RetryPolicy, Step};
use dagrun::exec::StepRunner;

/// Builder for `Step` to simplify test setup.
pub struct StepBuilder {
    step: Step,
}

impl StepBuilder {
    pub fn new(name: &str) -> Self {
        let mut step = Step::new(name, "echo");
        step.args = vec![name.to_string()];
        Self { step }
    }

    pub fn command(mut self, command: &str) -> Self {
        self.step.command = command.to_string();
        self.step.args = Vec::new();
        self
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.step.args = args.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn shell(mut self) -> Self {
        self.step.shell = true;
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.step.depends.push(dep.to_string());
        self
    }

    pub fn precondition(mut self, condition: &str, expected: &str) -> Self {
        self.step
            .preconditions
            .push(Condition::new(condition, expected));
        self
    }

    pub fn continue_on_failure(mut self) -> Self {
        self.step.continue_on.failure = true;
        self
    }

    pub fn continue_on_skipped(mut self) -> Self {
        self.step.continue_on.skipped = true;
        self
    }

    pub fn retry(mut self, limit: u32) -> Self {
        self.step.retry_policy = RetryPolicy { limit };
        self
    }

    pub fn repeat(mut self, interval: Duration) -> Self {
        self.step.repeat_policy = RepeatPolicy {
            repeat: true,
            interval,
        };
        self
    }

    pub fn build(self) -> Step {
        self.step
    }

    /// Bind the step to a runner, producing a schedulable node.
    pub fn build_node(self, runner: Arc<dyn StepRunner>) -> Node {
        Node::new(self.step, runner)
    }
}

/// Build a graph from nodes, panicking on invalid shapes (tests construct
/// valid graphs unless they are explicitly testing validation).
pub fn graph(nodes: Vec<Node>) -> ExecutionGraph {
    ExecutionGraph::new(nodes).expect("failed to build valid execution graph")
}
