// src/lib.rs

//! dagrun: a DAG execution scheduler for command workflows.
//!
//! Given an acyclic graph of steps (external commands with dependencies,
//! preconditions, retry/repeat policy and continue-on rules), the
//! [`Scheduler`] drives the graph to completion: dependency order,
//! bounded concurrency, partial-failure propagation, cooperative
//! cancellation and lifecycle handlers (on-success / on-failure /
//! on-cancel / on-exit).
//!
//! The scheduler consumes an already-built [`ExecutionGraph`]; each
//! [`Node`] carries its own execute/signal/cancel capability behind the
//! [`StepRunner`] trait. Workflow-file parsing, precondition expression
//! languages and control surfaces live outside this crate.

pub mod conditions;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod sched;
pub mod settings;

pub use conditions::{Condition, ConditionEvaluator, EnvEvaluator};
pub use dag::{
    ContinueOn, ExecutionGraph, Node, NodeState, NodeStatus, RepeatPolicy, RetryPolicy, Step,
};
pub use errors::{GraphError, NodeError, SchedulerError};
pub use exec::{CommandRunner, Signal, StepRunner};
pub use sched::{Config, DoneSender, HandlerType, Scheduler, SchedulerStatus};
