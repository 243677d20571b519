//! Core shared types for the toolrun execution runtime.

#![warn(missing_docs, clippy::pedantic)]

mod backend;
mod error;
mod ids;
mod tool;

/// Backend bindings describing how a tool is executed.
pub use backend::{Backend, BackendKind, LocalBackend, ProviderBackend, RemoteBackend};
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Canonical `namespace:name` tool identifier.
pub use ids::ToolId;
/// Tool definitions and call arguments.
pub use tool::{Args, Tool, ToolBuilder};
