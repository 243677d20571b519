//! Execution runtime for schema-described tools.
//!
//! A [`Runner`] takes a tool id and arguments, resolves the tool through a
//! [`ToolIndex`](tool_index::ToolIndex) (falling back to injected resolver
//! functions), selects a backend, validates input, dispatches to a remote
//! server, a provider or a local handler, normalizes the outcome into a
//! [`RunResult`] and validates output. Streaming runs and sequential chains
//! are built on the same pipeline, and [`ProgressRunner`] adds progress
//! callbacks to any runner.

#![warn(missing_docs, clippy::pedantic)]

mod chain;
mod config;
mod dispatch;
mod error;
mod executor;
mod normalize;
mod progress;
mod protocol;
mod resolve;
mod result;
mod runner;
mod select;
mod stream;
mod validate;

#[cfg(test)]
mod testing;

pub use chain::{ChainError, ChainOutput, ChainStep, PREVIOUS_KEY, StepResult};
pub use config::{
    BackendsResolverFn, RunnerBuilder, RunnerConfig, RunnerSettings, STREAM_BUFFER_ENV,
    SettingsError, ToolResolverFn, VALIDATE_INPUT_ENV, VALIDATE_OUTPUT_ENV,
};
pub use dispatch::DispatchError;
pub use error::{ErrorKind, Operation, RunError, RuntimeResult, SharedError};
pub use executor::{BackendError, BackendResult, EventStream, ProviderExecutor, RemoteExecutor};
pub use normalize::extract_structured;
pub use progress::{ProgressCallback, ProgressEvent, ProgressRunner};
pub use protocol::{CallRequest, ContentPart, ProtocolResult};
pub use result::RunResult;
pub use runner::{DefaultRunner, Runner};
pub use select::{BackendSelector, PrioritySelector};
pub use stream::{StreamEvent, StreamEventKind};
pub use validate::{JsonSchemaValidator, SchemaValidator, ValidationError, ValidationResult};
