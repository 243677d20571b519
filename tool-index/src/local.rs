//! Registry of in-process handlers backing `local` tools.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tool_primitives::Args;
use tracing::debug;

/// Result alias for handler operations.
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Trait implemented by in-process tool handlers.
#[async_trait]
pub trait LocalHandler: Send + Sync {
    /// Invokes the handler with the call arguments.
    ///
    /// `cancel` is the caller's cancellation signal; long-running handlers
    /// should return [`HandlerError::Cancelled`] once it fires.
    async fn invoke(&self, cancel: CancellationToken, args: Args) -> HandlerResult<Value>;
}

#[async_trait]
impl<F, Fut> LocalHandler for F
where
    F: Send + Sync + Fn(Args) -> Fut,
    Fut: Future<Output = HandlerResult<Value>> + Send,
{
    async fn invoke(&self, _cancel: CancellationToken, args: Args) -> HandlerResult<Value> {
        (self)(args).await
    }
}

/// Lookup contract used by the runtime to find local handlers.
///
/// Unknown names return `None`; a returned handler is always invocable.
pub trait LocalRegistry: Send + Sync {
    /// Returns the handler registered under `name`.
    fn get(&self, name: &str) -> Option<Arc<dyn LocalHandler>>;
}

/// Thread-safe [`LocalRegistry`] keyed by handler name.
#[derive(Default)]
pub struct HandlerRegistry {
    inner: RwLock<HashMap<String, Arc<dyn LocalHandler>>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("registered", &self.names())
            .finish()
    }
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::InvalidName`] for blank names and
    /// [`HandlerError::DuplicateHandler`] if the name is already taken.
    pub fn register<H>(&self, name: impl Into<String>, handler: H) -> HandlerResult<()>
    where
        H: LocalHandler + 'static,
    {
        self.register_shared(name, Arc::new(handler))
    }

    /// Registers an already shared handler under `name`.
    ///
    /// # Errors
    ///
    /// Same as [`HandlerRegistry::register`].
    pub fn register_shared(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn LocalHandler>,
    ) -> HandlerResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(HandlerError::InvalidName {
                reason: "handler name cannot be empty".into(),
            });
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.contains_key(&name) {
            return Err(HandlerError::DuplicateHandler { name });
        }

        debug!(handler = %name, "local handler registered");
        inner.insert(name, handler);
        Ok(())
    }

    /// Removes the handler registered under `name`, returning it if present.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn LocalHandler>> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Invokes a registered handler directly.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::UnknownHandler`] when the name is not
    /// registered, or whatever error the handler itself produced.
    pub async fn invoke(
        &self,
        name: &str,
        cancel: CancellationToken,
        args: Args,
    ) -> HandlerResult<Value> {
        let handler = self.get(name).ok_or_else(|| HandlerError::UnknownHandler {
            name: name.to_owned(),
        })?;
        handler.invoke(cancel, args).await
    }

    /// Lists the registered handler names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = inner.keys().cloned().collect();
        names.sort();
        names
    }
}

impl LocalRegistry for HandlerRegistry {
    fn get(&self, name: &str) -> Option<Arc<dyn LocalHandler>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.get(name).cloned()
    }
}

/// Errors produced by handler registration and invocation.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Handler name failed validation.
    #[error("invalid handler name: {reason}")]
    InvalidName {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Handler name collided with an existing registration.
    #[error("handler `{name}` is already registered")]
    DuplicateHandler {
        /// Name of the offending handler.
        name: String,
    },

    /// Requested handler does not exist.
    #[error("handler `{name}` is not registered")]
    UnknownHandler {
        /// Name of the missing handler.
        name: String,
    },

    /// Handler rejected its arguments.
    #[error("invalid arguments: {reason}")]
    InvalidArguments {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Handler execution failed.
    #[error("handler execution failed: {reason}")]
    Execution {
        /// Human-readable error returned by the handler.
        reason: String,
    },

    /// Handler observed cancellation and stopped.
    #[error("handler cancelled")]
    Cancelled,
}

impl HandlerError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }

    /// Creates an invalid-arguments error from the supplied reason.
    #[must_use]
    pub fn invalid_arguments(reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            reason: reason.into(),
        }
    }
}
