//! Execution runtime for schema-described tools.
//!
//! Depend on this crate via `cargo add toolrun`. It bundles the workspace
//! crates behind feature flags so downstream users can pull in only the
//! registry contracts, the full runner, or the runner plus logging helpers.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use tool_primitives as primitives;

/// Tool index and local handler registry (enabled by `index` feature).
#[cfg(feature = "index")]
pub use tool_index as index;

/// Execution pipeline, streaming, and chains (enabled by `runtime` feature).
#[cfg(feature = "runtime")]
pub use tool_runtime as runtime;

/// Subscriber bootstrap and log observers (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use tool_telemetry as telemetry;

/// Common imports for building and driving a runner.
#[cfg(feature = "runtime")]
pub mod prelude {
    pub use tool_index::{HandlerRegistry, InMemoryIndex, LocalHandler, ToolIndex};
    pub use tool_primitives::{Args, Backend, Tool};
    pub use tool_runtime::{
        ChainStep, DefaultRunner, ErrorKind, ProgressRunner, RunError, RunResult, Runner,
        StreamEvent,
    };
}
