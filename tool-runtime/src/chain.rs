//! Sequential chains with optional result threading.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tool_primitives::{Args, Backend};
use tracing::{debug, warn};

use crate::error::{ErrorKind, Operation, RunError};
use crate::result::RunResult;
use crate::runner::Runner;

/// Argument key under which a threaded step receives the prior result.
pub const PREVIOUS_KEY: &str = "previous";

/// One call in a chain.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStep {
    /// Canonical id of the tool to call.
    pub tool_id: String,
    /// Step-local arguments; copied before any injection.
    #[serde(default)]
    pub args: Args,
    /// Inject the previous step's structured value under [`PREVIOUS_KEY`].
    #[serde(default)]
    pub use_previous: bool,
}

impl ChainStep {
    /// Creates a step with no arguments.
    #[must_use]
    pub fn new(tool_id: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            ..Self::default()
        }
    }

    /// Sets the step arguments.
    #[must_use]
    pub fn with_args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }

    /// Threads the previous step's result into this step.
    #[must_use]
    pub fn use_previous(mut self) -> Self {
        self.use_previous = true;
        self
    }
}

/// Record of one attempted step.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    /// Tool id the step called.
    pub tool_id: String,
    /// Backend used, when known, even if the step failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<Backend>,
    /// Result of a successful step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RunResult>,
    /// Failure of an unsuccessful step. Never serialized.
    #[serde(skip)]
    pub error: Option<RunError>,
}

impl StepResult {
    fn succeeded(tool_id: String, result: RunResult) -> Self {
        Self {
            tool_id,
            backend: Some(result.backend().clone()),
            result: Some(result),
            error: None,
        }
    }

    fn failed(tool_id: String, error: RunError) -> Self {
        Self {
            tool_id,
            backend: error.backend().cloned(),
            result: None,
            error: Some(error),
        }
    }

    /// Returns `true` when the step completed without error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a chain that ran to completion.
#[derive(Clone, Debug)]
pub struct ChainOutput {
    /// Result of the last step; `None` for an empty chain.
    pub result: Option<RunResult>,
    /// One record per step, in order.
    pub steps: Vec<StepResult>,
}

/// Failure of a chain, with the steps attempted so far.
#[derive(Clone, Debug, Error)]
#[error("chain stopped after {} step(s): {error}", steps.len())]
pub struct ChainError {
    /// Records of every attempted step, including the failing one.
    pub steps: Vec<StepResult>,
    /// Error of the failing step, or the cancellation that stopped the chain.
    #[source]
    pub error: RunError,
}

/// Runs `steps` in order through `runner`, stopping at the first failure.
///
/// `on_step` is called with the number of completed steps after each
/// success.
pub(crate) async fn execute_chain<R>(
    runner: &R,
    cancel: &CancellationToken,
    steps: &[ChainStep],
    on_step: &(dyn Fn(usize) + Send + Sync),
) -> Result<ChainOutput, ChainError>
where
    R: Runner + ?Sized,
{
    let mut records = Vec::with_capacity(steps.len());
    let mut previous = Value::Null;
    let mut last = None;

    for (position, step) in steps.iter().enumerate() {
        if cancel.is_cancelled() {
            debug!(tool_id = %step.tool_id, step = position, "chain cancelled");
            return Err(ChainError {
                steps: records,
                error: RunError::new(ErrorKind::Cancelled, step.tool_id.clone(), Operation::Start),
            });
        }

        let mut args = step.args.clone();
        if step.use_previous {
            args.insert(PREVIOUS_KEY.to_owned(), previous.clone());
        }

        match runner.run(cancel, &step.tool_id, args).await {
            Ok(result) => {
                debug!(tool_id = %step.tool_id, step = position, "chain step completed");
                previous = result.structured().clone();
                records.push(StepResult::succeeded(step.tool_id.clone(), result.clone()));
                last = Some(result);
                on_step(position + 1);
            }
            Err(error) => {
                warn!(tool_id = %step.tool_id, step = position, error = %error, "chain step failed");
                records.push(StepResult::failed(step.tool_id.clone(), error.clone()));
                return Err(ChainError {
                    steps: records,
                    error,
                });
            }
        }
    }

    Ok(ChainOutput {
        result: last,
        steps: records,
    })
}
