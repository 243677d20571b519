//! Shared error definitions for tool primitives.

use thiserror::Error;

/// Result alias used throughout the primitives crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The provided tool identifier could not be parsed.
    #[error("invalid tool id `{id}`: {reason}")]
    InvalidToolId {
        /// The offending identifier string.
        id: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Tool definition failed validation.
    #[error("invalid tool definition: {reason}")]
    InvalidTool {
        /// Human-readable reason for rejection.
        reason: String,
    },
}
