// src/sched/worker.rs

//! Per-node execution loop.
//!
//! One worker task runs per dispatched node. Retry is decided here: a
//! failed attempt with retries left moves the node back to `NotStarted`
//! and the worker exits, leaving re-dispatch to the scheduler's
//! `NotStarted` gate. Repeat iterations stay inside this loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::dag::{Node, NodeStatus};
use crate::errors::NodeError;
use crate::sched::{DoneSender, SchedState};

/// Everything a worker needs besides its node.
pub(crate) struct WorkerEnv {
    pub(crate) dry: bool,
    pub(crate) log_dir: PathBuf,
    pub(crate) state: Arc<SchedState>,
}

pub(crate) async fn run_node(env: Arc<WorkerEnv>, node: Arc<Node>, done: Option<DoneSender>) {
    if !env.dry {
        if let Err(err) = node.setup_log(&env.log_dir).and_then(|_| node.open_log_file()) {
            warn!(step = %node.name(), error = %err, "failed to open step log file");
        }
    }

    loop {
        if env.state.is_canceled() {
            break;
        }

        let exec_err = if env.dry {
            None
        } else {
            node.execute().await.err()
        };

        if let Some(err) = &exec_err {
            apply_failure(&node, err);
            if node.status() == NodeStatus::Error {
                let error = NodeError::Execution(format!("{err:#}"));
                node.set_error(error.clone());
                env.state.set_last_error(error);
            }
        }

        let status = node.status();
        if !matches!(status, NodeStatus::Cancel | NodeStatus::NotStarted) {
            node.inc_done_count();
        }

        if status == NodeStatus::NotStarted {
            // Retry scheduled; the dispatch loop re-picks this node with a
            // fresh worker.
            break;
        }

        let repeat = node.step().repeat_policy;
        if repeat.repeat
            && (exec_err.is_none() || node.step().continue_on.failure)
            && !env.state.is_canceled()
        {
            sleep(repeat.interval).await;
            continue;
        }

        break;
    }

    if node.status() == NodeStatus::Running {
        node.update_status(NodeStatus::Success);
    }
    node.set_finished_at(SystemTime::now());

    if !env.dry {
        node.close_log_file();
    }

    // Terminal states only; a retry reschedule is not a completion.
    if node.status() != NodeStatus::NotStarted {
        if let Some(done) = &done {
            let _ = done.send(Arc::clone(&node));
        }
    }
}

/// Decide between retry and failure for a failed attempt. Nodes already
/// cancelled (or somehow finished) are left alone.
fn apply_failure(node: &Node, err: &anyhow::Error) {
    let status = node.status();
    if status == NodeStatus::Cancel || status == NodeStatus::Success {
        return;
    }

    if node.retry_count() < node.step().retry_policy.limit {
        info!(
            step = %node.name(),
            retry = node.retry_count() + 1,
            limit = node.step().retry_policy.limit,
            error = %err,
            "step failed; scheduling retry"
        );
        node.inc_retry_count();
        node.update_status(NodeStatus::NotStarted);
    } else {
        warn!(step = %node.name(), error = %err, "step failed");
        node.update_status(NodeStatus::Error);
    }
}
