// src/dag/step.rs

//! Step definitions and per-step policies.
//!
//! These are the types an external workflow-definition layer deserializes
//! into. The scheduler treats `command` and `args` as opaque; only the
//! policies influence scheduling decisions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::conditions::Condition;

/// One executable step of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    /// Program (or shell line, see `shell`) to run. Opaque to the scheduler.
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// If true the command is run through the platform shell.
    #[serde(default)]
    pub shell: bool,
    /// Names of steps that must resolve before this one may start.
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub preconditions: Vec<Condition>,
    #[serde(default)]
    pub continue_on: ContinueOn,
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    #[serde(default)]
    pub repeat_policy: RepeatPolicy,
}

impl Step {
    /// A step running `command` with no arguments and default policies.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            shell: false,
            depends: Vec::new(),
            preconditions: Vec::new(),
            continue_on: ContinueOn::default(),
            retry_policy: RetryPolicy::default(),
            repeat_policy: RepeatPolicy::default(),
        }
    }
}

/// Declares whether steps depending on this one may proceed past a
/// non-success outcome of this step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinueOn {
    /// Dependents may run even if this step fails.
    pub failure: bool,
    /// Dependents may run even if this step is skipped.
    pub skipped: bool,
}

/// Bounded re-execution of a failing step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first failed attempt.
    pub limit: u32,
}

/// Periodic re-execution of a step until the run is cancelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatPolicy {
    pub repeat: bool,
    /// Pause between iterations, serialized as whole seconds.
    #[serde(with = "duration_secs")]
    pub interval: Duration,
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
