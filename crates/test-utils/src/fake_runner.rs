use std::fs::File;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use tokio::sync::Notify;
use tokio::time::sleep;

use dagrun::dag::Step;
use dagrun::exec::{Signal, StepRunner};

/// Shared observer for fake executions: records start order and tracks
/// the peak number of simultaneously running steps.
#[derive(Debug, Default)]
pub struct Recorder {
    executions: Mutex<Vec<String>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn started(&self, name: &str) {
        self.executions.lock().unwrap().push(name.to_string());
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn finished(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }

    /// Step names in execution start order (one entry per attempt).
    pub fn executions(&self) -> Vec<String> {
        self.executions.lock().unwrap().clone()
    }

    pub fn execution_count(&self) -> usize {
        self.executions.lock().unwrap().len()
    }

    pub fn peak_running(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// A `StepRunner` that never spawns processes.
///
/// - optionally sleeps to simulate work (interruptible by signal/cancel)
/// - optionally fails the first N attempts, or every attempt
/// - reports into a shared [`Recorder`]
pub struct FakeRunner {
    latency: Duration,
    fail_first: u32,
    fail_always: bool,
    calls: AtomicU32,
    stop: Notify,
    canceled: AtomicBool,
    recorder: Option<Arc<Recorder>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            fail_first: 0,
            fail_always: false,
            calls: AtomicU32::new(0),
            stop: Notify::new(),
            canceled: AtomicBool::new(false),
            recorder: None,
        }
    }

    /// Simulate work taking this long per attempt.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail the first `n` attempts, then succeed.
    pub fn failing(mut self, n: u32) -> Self {
        self.fail_first = n;
        self
    }

    /// Fail every attempt.
    pub fn always_failing(mut self) -> Self {
        self.fail_always = true;
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<Recorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl StepRunner for FakeRunner {
    fn execute<'a>(
        &'a self,
        step: &'a Step,
        _log: Option<File>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if self.canceled.load(Ordering::SeqCst) {
                bail!("step '{}' was cancelled before start", step.name);
            }

            let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(recorder) = &self.recorder {
                recorder.started(&step.name);
            }

            let interrupted = if self.latency.is_zero() {
                false
            } else {
                tokio::select! {
                    _ = sleep(self.latency) => false,
                    _ = self.stop.notified() => true,
                }
            };

            if let Some(recorder) = &self.recorder {
                recorder.finished();
            }

            if interrupted {
                bail!("step '{}' was terminated", step.name);
            }
            if self.fail_always || attempt < self.fail_first {
                bail!("step '{}' failed (attempt {})", step.name, attempt + 1);
            }
            Ok(())
        })
    }

    fn signal(&self, _signal: Signal) {
        self.stop.notify_one();
    }

    fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
        self.stop.notify_one();
    }
}
