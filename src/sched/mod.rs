// src/sched/mod.rs

//! Scheduling engine.
//!
//! - [`scheduler`] owns the dispatch loop, signal/cancel control and
//!   status derivation.
//! - [`worker`] is the per-node execution loop (retry and repeat live
//!   there).
//! - [`handlers`] names the lifecycle handler slots.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::dag::Node;
use crate::errors::NodeError;

pub mod handlers;
pub mod scheduler;
mod worker;

pub use handlers::HandlerType;
pub use scheduler::{Config, Scheduler};

/// Overall outcome of a run, derived on demand and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerStatus {
    NotStarted,
    Running,
    Error,
    Cancel,
    Success,
}

impl fmt::Display for SchedulerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchedulerStatus::NotStarted => "not started",
            SchedulerStatus::Running => "running",
            SchedulerStatus::Error => "failed",
            SchedulerStatus::Cancel => "canceled",
            SchedulerStatus::Success => "finished",
        };
        f.write_str(s)
    }
}

/// Channel on which every node (handlers included) is delivered as it
/// reaches a terminal status. Unbounded so workers never block on
/// delivery; order is completion order, not topological order.
pub type DoneSender = mpsc::UnboundedSender<Arc<Node>>;

/// State shared between the dispatch loop, workers and the control
/// surface (signal/cancel).
pub(crate) struct SchedState {
    canceled: AtomicBool,
    last_error: Mutex<Option<NodeError>>,
}

impl SchedState {
    pub(crate) fn new() -> Self {
        Self {
            canceled: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    pub(crate) fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    pub(crate) fn set_canceled(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    /// Last-writer-wins; concurrent failures race deliberately.
    pub(crate) fn set_last_error(&self, error: NodeError) {
        let mut guard = self.last_error.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(error);
    }

    pub(crate) fn last_error(&self) -> Option<NodeError> {
        self.last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
