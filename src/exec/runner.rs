// src/exec/runner.rs

//! Per-node execution capability.
//!
//! The scheduler never launches processes itself; each [`Node`] carries a
//! `StepRunner` that knows how to run, signal and cancel its step.
//! Production code uses [`CommandRunner`](crate::exec::CommandRunner);
//! tests provide their own implementation that doesn't spawn real
//! processes.
//!
//! [`Node`]: crate::dag::Node

use std::fmt;
use std::fs::File;
use std::future::Future;
use std::pin::Pin;

use crate::dag::step::Step;

/// Stop signal forwarded to a running step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
    Kill,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Kill => "SIGKILL",
        };
        f.write_str(s)
    }
}

/// Capability contract consumed by the scheduler for every node.
pub trait StepRunner: Send + Sync {
    /// Run the step to completion. Blocking from the caller's point of
    /// view; may be invoked multiple times per node (retry, repeat).
    /// Output should go to `log` when one is provided.
    fn execute<'a>(
        &'a self,
        step: &'a Step,
        log: Option<File>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

    /// Forward a signal to the running process, if any.
    fn signal(&self, signal: Signal);

    /// Request termination of the current and any future execution.
    fn cancel(&self);
}
