// src/exec/command.rs

//! Process-backed [`StepRunner`] used in production.

use std::fs::File;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Context};
use tokio::process::Command;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::dag::step::Step;
use crate::exec::runner::{Signal, StepRunner};

/// Runs a step as an OS process.
///
/// Output goes to the node's log file when one is open. Stop requests
/// (signal or cancel) kill the child; `cancel` additionally makes every
/// future execution fail immediately.
#[derive(Debug, Default)]
pub struct CommandRunner {
    stop: Notify,
    canceled: AtomicBool,
}

impl CommandRunner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StepRunner for CommandRunner {
    fn execute<'a>(
        &'a self,
        step: &'a Step,
        log: Option<File>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if self.canceled.load(Ordering::SeqCst) {
                bail!("step '{}' was cancelled before start", step.name);
            }

            let mut cmd = build_command(step);
            match log {
                Some(file) => {
                    let out = file
                        .try_clone()
                        .with_context(|| format!("cloning log handle for step '{}'", step.name))?;
                    cmd.stdout(Stdio::from(out)).stderr(Stdio::from(file));
                }
                None => {
                    cmd.stdout(Stdio::null()).stderr(Stdio::null());
                }
            }
            cmd.stdin(Stdio::null()).kill_on_drop(true);

            info!(step = %step.name, command = %step.command, "starting step process");

            let mut child = cmd
                .spawn()
                .with_context(|| format!("spawning process for step '{}'", step.name))?;

            tokio::select! {
                status = child.wait() => {
                    let status = status.with_context(|| {
                        format!("waiting for process of step '{}'", step.name)
                    })?;

                    let code = exit_code(status);
                    info!(
                        step = %step.name,
                        exit_code = code,
                        success = status.success(),
                        "step process exited"
                    );

                    if status.success() {
                        Ok(())
                    } else {
                        bail!("step '{}' exited with code {}", step.name, code)
                    }
                }

                _ = self.stop.notified() => {
                    info!(step = %step.name, "stop requested; killing step process");
                    if let Err(err) = child.kill().await {
                        warn!(step = %step.name, error = %err, "failed to kill step process");
                    }
                    bail!("step '{}' was terminated", step.name)
                }
            }
        })
    }

    fn signal(&self, signal: Signal) {
        debug!(%signal, "forwarding stop signal to step process");
        self.stop.notify_one();
    }

    fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
        self.stop.notify_one();
    }
}

/// Build the process invocation for a step.
///
/// Shell steps go through the platform shell; otherwise the command is
/// executed directly with its argument vector.
fn build_command(step: &Step) -> Command {
    if step.shell {
        let line = if step.args.is_empty() {
            step.command.clone()
        } else {
            format!("{} {}", step.command, step.args.join(" "))
        };
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(line);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(line);
            c
        }
    } else {
        let mut c = Command::new(&step.command);
        c.args(&step.args);
        c
    }
}

fn exit_code(status: std::process::ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(code) = status.code() {
            code
        } else if let Some(sig) = status.signal() {
            128 + sig
        } else {
            1
        }
    }
    #[cfg(not(unix))]
    {
        status.code().unwrap_or(1)
    }
}
