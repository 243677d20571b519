//! Execution core: resolve, select, validate, dispatch, normalize.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tool_primitives::{Args, Backend, Tool};
use tracing::{debug, info, warn};

use crate::chain::{ChainError, ChainOutput, ChainStep, execute_chain};
use crate::config::{RunnerBuilder, RunnerConfig};
use crate::dispatch::{Outcome, dispatch, dispatch_stream};
use crate::error::{ErrorKind, Operation, RunError, RuntimeResult};
use crate::executor::EventStream;
use crate::normalize::normalize;
use crate::resolve::{ResolveError, resolve};
use crate::result::RunResult;
use crate::stream::bridge;

/// Entry point for executing tools.
///
/// Implementations must be safe for concurrent use and must stop with an
/// [`ErrorKind::Cancelled`] error once `cancel` has fired.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Runs one tool and returns its normalized result.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] tagged with the failing operation.
    async fn run(
        &self,
        cancel: &CancellationToken,
        tool_id: &str,
        args: Args,
    ) -> RuntimeResult<RunResult>;

    /// Runs one tool on a streaming backend.
    ///
    /// The returned stream ends when the backend stream ends or `cancel`
    /// fires.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::StreamNotSupported`] when the selected backend
    /// cannot stream, or the same errors as [`Runner::run`] otherwise.
    async fn run_stream(
        &self,
        cancel: &CancellationToken,
        tool_id: &str,
        args: Args,
    ) -> RuntimeResult<EventStream>;

    /// Runs `steps` in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns a [`ChainError`] holding the attempted steps and the error of
    /// the failing one.
    async fn run_chain(
        &self,
        cancel: &CancellationToken,
        steps: &[ChainStep],
    ) -> Result<ChainOutput, ChainError> {
        execute_chain(self, cancel, steps, &|_: usize| {}).await
    }
}

/// Runner driven by a [`RunnerConfig`].
#[derive(Clone, Debug)]
pub struct DefaultRunner {
    config: RunnerConfig,
}

impl DefaultRunner {
    /// Starts building a runner.
    #[must_use]
    pub fn builder() -> RunnerBuilder {
        RunnerBuilder::new()
    }

    pub(crate) fn from_config(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration in effect.
    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    fn prepare(
        &self,
        cancel: &CancellationToken,
        tool_id: &str,
        args: &Args,
    ) -> RuntimeResult<(Tool, Backend)> {
        if cancel.is_cancelled() {
            return Err(RunError::new(ErrorKind::Cancelled, tool_id, Operation::Start));
        }
        if tool_id.is_empty() {
            return Err(RunError::new(
                ErrorKind::InvalidToolId,
                tool_id,
                Operation::ValidateToolId,
            ));
        }

        let resolved = resolve(&self.config, tool_id).map_err(|err| resolve_error(tool_id, err))?;

        let backend = self
            .config
            .selector
            .select(&resolved.backends)
            .ok_or_else(|| {
                RunError::new(ErrorKind::NoBackends, tool_id, Operation::SelectBackend)
            })?;
        debug!(tool_id, backend = %backend, "backend selected");

        if self.config.settings.validate_input {
            self.config
                .validator
                .validate_input(&resolved.tool, args)
                .map_err(|err| {
                    RunError::new(ErrorKind::Validation, tool_id, Operation::ValidateInput)
                        .with_backend(backend.clone())
                        .with_source(err)
                })?;
        }

        Ok((resolved.tool, backend))
    }
}

fn resolve_error(tool_id: &str, err: ResolveError) -> RunError {
    match err {
        ResolveError::ToolNotFound { source } => {
            let error = RunError::new(ErrorKind::ToolNotFound, tool_id, Operation::Resolve);
            match source {
                Some(source) => error.with_source(source),
                None => error,
            }
        }
        ResolveError::NoBackends => {
            RunError::new(ErrorKind::NoBackends, tool_id, Operation::Resolve)
        }
        ResolveError::Index(source) => {
            RunError::new(ErrorKind::Registry, tool_id, Operation::Resolve).with_source(source)
        }
    }
}

#[async_trait]
impl Runner for DefaultRunner {
    async fn run(
        &self,
        cancel: &CancellationToken,
        tool_id: &str,
        args: Args,
    ) -> RuntimeResult<RunResult> {
        let (tool, backend) = self.prepare(cancel, tool_id, &args)?;

        let outcome = dispatch(&self.config, cancel, &tool, &backend, args)
            .await
            .map_err(|err| {
                RunError::new(ErrorKind::Execution, tool_id, Operation::Execute)
                    .with_backend(backend.clone())
                    .with_source(err)
            })?;
        if let Outcome::Protocol(result) = &outcome {
            if result.is_error {
                warn!(tool_id, backend = %backend, "remote server flagged the result as an error");
            }
        }

        let result = normalize(tool, backend, outcome);

        if self.config.settings.validate_output {
            self.config
                .validator
                .validate_output(result.tool(), result.structured())
                .map_err(|err| {
                    RunError::new(
                        ErrorKind::OutputValidation,
                        tool_id,
                        Operation::ValidateOutput,
                    )
                    .with_backend(result.backend().clone())
                    .with_source(err)
                })?;
        }

        info!(tool_id, backend = %result.backend(), "tool run completed");
        Ok(result)
    }

    async fn run_stream(
        &self,
        cancel: &CancellationToken,
        tool_id: &str,
        args: Args,
    ) -> RuntimeResult<EventStream> {
        let (tool, backend) = self.prepare(cancel, tool_id, &args)?;

        let raw = dispatch_stream(&self.config, cancel, &tool, &backend, args)
            .await
            .map_err(|err| {
                let kind = if err.is_stream_not_supported() {
                    ErrorKind::StreamNotSupported
                } else {
                    ErrorKind::Execution
                };
                RunError::new(kind, tool_id, Operation::Stream)
                    .with_backend(backend.clone())
                    .with_source(err)
            })?;

        let Some(raw) = raw else {
            return Err(
                RunError::new(ErrorKind::StreamNotSupported, tool_id, Operation::Stream)
                    .with_backend(backend),
            );
        };

        info!(tool_id, backend = %backend, "tool stream opened");
        Ok(bridge(
            raw,
            tool_id.to_owned(),
            cancel.clone(),
            self.config.settings.stream_buffer,
        ))
    }
}
