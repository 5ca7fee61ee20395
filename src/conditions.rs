// src/conditions.rs

//! Step preconditions and their evaluation seam.
//!
//! A [`Condition`] is plain data attached to a step definition. How the
//! `condition` string is resolved to an actual value is the business of a
//! [`ConditionEvaluator`]; the scheduler only cares whether the whole list
//! holds. The bundled [`EnvEvaluator`] expands environment variables and
//! compares literally, which covers the common "is this variable set to X"
//! gate. Richer expression languages belong to the definition layer, not
//! here.

use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single precondition: `condition` must evaluate to `expected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub condition: String,
    pub expected: String,
}

impl Condition {
    pub fn new(condition: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            expected: expected.into(),
        }
    }
}

/// Raised when a condition does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("condition `{condition}` evaluated to `{actual}`, expected `{expected}`")]
pub struct ConditionError {
    pub condition: String,
    pub expected: String,
    pub actual: String,
}

/// Evaluates step preconditions.
///
/// Implementations resolve the `condition` string however they see fit;
/// the default list evaluation short-circuits on the first failure.
pub trait ConditionEvaluator: Send + Sync {
    fn eval_condition(&self, condition: &Condition)
        -> std::result::Result<(), ConditionError>;

    fn eval_conditions(
        &self,
        conditions: &[Condition],
    ) -> std::result::Result<(), ConditionError> {
        for condition in conditions {
            self.eval_condition(condition)?;
        }
        Ok(())
    }
}

/// Default evaluator: expands `$VAR` / `${VAR}` from the process
/// environment in the `condition` string, then compares the result to
/// `expected` literally. Unset variables expand to the empty string.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvEvaluator;

impl ConditionEvaluator for EnvEvaluator {
    fn eval_condition(
        &self,
        condition: &Condition,
    ) -> std::result::Result<(), ConditionError> {
        let actual = expand_env(&condition.condition);
        if actual == condition.expected {
            Ok(())
        } else {
            Err(ConditionError {
                condition: condition.condition.clone(),
                expected: condition.expected.clone(),
                actual,
            })
        }
    }
}

/// Expand `$VAR` and `${VAR}` occurrences from the environment.
fn expand_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        match chars.peek() {
            Some(&(_, '{')) => {
                chars.next();
                let rest = &input[i + 2..];
                match rest.find('}') {
                    Some(end) => {
                        out.push_str(&lookup(&rest[..end]));
                        // Skip past the name and the closing brace.
                        for (_, ch) in chars.by_ref() {
                            if ch == '}' {
                                break;
                            }
                        }
                    }
                    None => {
                        // Unterminated `${`; keep it verbatim.
                        out.push_str("${");
                    }
                }
            }
            Some(&(_, c2)) if c2 == '_' || c2.is_ascii_alphabetic() => {
                let rest = &input[i + 1..];
                let len = rest
                    .find(|ch: char| ch != '_' && !ch.is_ascii_alphanumeric())
                    .unwrap_or(rest.len());
                out.push_str(&lookup(&rest[..len]));
                for _ in 0..len {
                    chars.next();
                }
            }
            _ => out.push('$'),
        }
    }

    out
}

fn lookup(name: &str) -> String {
    env::var(name).unwrap_or_default()
}
