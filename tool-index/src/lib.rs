//! Tool lookup and local handler registration.
//!
//! [`index`] defines the registry contract the runtime resolves tools
//! through, together with an in-memory implementation. [`local`] holds the
//! registry of in-process handlers that back `local` tools.

#![warn(missing_docs, clippy::pedantic)]

pub mod index;
pub mod local;

pub use index::{InMemoryIndex, IndexError, IndexResult, ToolIndex};
pub use local::{HandlerError, HandlerRegistry, HandlerResult, LocalHandler, LocalRegistry};
