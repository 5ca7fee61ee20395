// src/errors.rs

//! Crate-wide error types.

use std::path::PathBuf;

use thiserror::Error;

/// Error recorded on a single node.
///
/// Cloneable so that node snapshots stay plain values; the execution
/// variant therefore carries the rendered message rather than the source
/// error itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// An upstream step failed and did not allow dependents to continue.
    #[error("upstream step failed")]
    UpstreamFailed,

    /// An upstream step was skipped and did not allow dependents to continue.
    #[error("upstream step skipped")]
    UpstreamSkipped,

    /// A precondition did not hold; the step was skipped.
    #[error("precondition not met: {0}")]
    Precondition(String),

    /// The step's command failed after exhausting its retries.
    #[error("step execution failed: {0}")]
    Execution(String),
}

/// Rejected graph shapes, raised while building an
/// [`ExecutionGraph`](crate::dag::ExecutionGraph).
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("step '{step}' has unknown dependency '{dep}'")]
    UnknownDependency { step: String, dep: String },

    #[error("step '{step}' cannot depend on itself")]
    SelfDependency { step: String },

    #[error("duplicate step name '{0}'")]
    DuplicateName(String),

    #[error("cycle detected in step graph involving '{0}'")]
    Cycle(String),
}

/// Error returned by [`Scheduler::schedule`](crate::sched::Scheduler::schedule).
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The log directory could not be created during setup. No workers
    /// were launched.
    #[error("failed to create log directory {dir:?}")]
    LogDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The last step or handler error observed during the run.
    #[error(transparent)]
    Step(#[from] NodeError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
