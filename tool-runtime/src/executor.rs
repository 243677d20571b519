//! Contracts for the remote and provider backends.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tool_index::HandlerError;
use tool_primitives::Args;

use crate::protocol::{CallRequest, ProtocolResult};
use crate::stream::StreamEvent;

/// Stream of events produced by a streaming backend call.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Result alias used by backend executors.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors reported by backend executors and local handlers.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The executor could not reach its target.
    #[error("connection to `{target}` failed: {reason}")]
    Connection {
        /// Server or provider identifier.
        target: String,
        /// Additional context for the failure.
        reason: String,
    },

    /// The backend accepted the call but it failed.
    #[error("backend call failed: {reason}")]
    Call {
        /// Additional context for the failure.
        reason: String,
    },

    /// The backend does not support streaming.
    #[error("streaming not supported")]
    StreamNotSupported,

    /// The call observed cancellation.
    #[error("backend call cancelled")]
    Cancelled,

    /// A local handler failed.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl BackendError {
    /// Convenience constructor for [`BackendError::Call`].
    #[must_use]
    pub fn call(reason: impl Into<String>) -> Self {
        Self::Call {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`BackendError::Connection`].
    #[must_use]
    pub fn connection(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connection {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Executes tools hosted by remote protocol servers.
///
/// Implementations must be safe for concurrent use and should honour `cancel`.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Calls `request.name` on `server`.
    async fn call_tool(
        &self,
        cancel: &CancellationToken,
        server: &str,
        request: CallRequest,
    ) -> BackendResult<ProtocolResult>;

    /// Calls `request.name` on `server`, streaming events back.
    ///
    /// `Ok(None)` means the server produced no stream; the runner reports it
    /// as unsupported rather than waiting on it.
    async fn call_tool_stream(
        &self,
        cancel: &CancellationToken,
        server: &str,
        request: CallRequest,
    ) -> BackendResult<Option<EventStream>> {
        let _ = (cancel, server, request);
        Err(BackendError::StreamNotSupported)
    }
}

/// Executes tools fulfilled by pluggable providers.
#[async_trait]
pub trait ProviderExecutor: Send + Sync {
    /// Calls `tool_id` on `provider_id`, returning its structured result.
    async fn call_tool(
        &self,
        cancel: &CancellationToken,
        provider_id: &str,
        tool_id: &str,
        args: Args,
    ) -> BackendResult<Value>;

    /// Streaming counterpart of [`ProviderExecutor::call_tool`].
    async fn call_tool_stream(
        &self,
        cancel: &CancellationToken,
        provider_id: &str,
        tool_id: &str,
        args: Args,
    ) -> BackendResult<Option<EventStream>> {
        let _ = (cancel, provider_id, tool_id, args);
        Err(BackendError::StreamNotSupported)
    }
}
