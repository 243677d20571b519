//! Registry contract used to resolve tool definitions and their backends.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use thiserror::Error;
use tool_primitives::{Backend, Tool};
use tracing::debug;

/// Result alias for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Lookup contract for tool definitions keyed by canonical identifier.
pub trait ToolIndex: Send + Sync {
    /// Returns the tool definition and its default backend.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFound`] when the identifier is unknown; any
    /// other variant signals an infrastructure fault.
    fn get_tool(&self, id: &str) -> IndexResult<(Tool, Backend)>;

    /// Returns every backend registered for the tool, in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFound`] when the identifier is unknown.
    fn get_all_backends(&self, id: &str) -> IndexResult<Vec<Backend>>;
}

/// Errors produced by tool indexes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// No tool is registered under the identifier.
    #[error("tool `{id}` not found in index")]
    NotFound {
        /// Identifier that was looked up.
        id: String,
    },

    /// The identifier is already registered.
    #[error("tool `{id}` is already registered")]
    DuplicateTool {
        /// Identifier of the offending tool.
        id: String,
    },

    /// Registration data failed validation.
    #[error("invalid registration: {reason}")]
    InvalidRegistration {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// The index could not serve the request.
    #[error("index unavailable: {reason}")]
    Unavailable {
        /// Human-readable reason describing the failure.
        reason: String,
    },
}

impl IndexError {
    /// Convenience constructor for [`IndexError::NotFound`].
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Convenience constructor for [`IndexError::Unavailable`].
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Returns `true` for the not-found condition.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Clone)]
struct Entry {
    tool: Tool,
    backends: Vec<Backend>,
    default: usize,
}

/// Thread-safe in-memory [`ToolIndex`].
///
/// The first backend supplied at registration becomes the default until
/// [`InMemoryIndex::set_default_backend`] says otherwise.
#[derive(Default)]
pub struct InMemoryIndex {
    inner: RwLock<HashMap<String, Entry>>,
}

impl fmt::Debug for InMemoryIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<_> = inner.keys().cloned().collect();
        ids.sort();
        f.debug_struct("InMemoryIndex")
            .field("registered", &ids)
            .finish()
    }
}

impl InMemoryIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool together with its backends.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidRegistration`] when `backends` is empty and
    /// [`IndexError::DuplicateTool`] when the canonical id is taken.
    pub fn register(&self, tool: Tool, backends: Vec<Backend>) -> IndexResult<()> {
        if backends.is_empty() {
            return Err(IndexError::InvalidRegistration {
                reason: format!("tool `{}` needs at least one backend", tool.id()),
            });
        }

        let id = tool.id();
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.contains_key(&id) {
            return Err(IndexError::DuplicateTool { id });
        }

        debug!(tool_id = %id, backends = backends.len(), "tool registered in index");
        inner.insert(
            id,
            Entry {
                tool,
                backends,
                default: 0,
            },
        );
        Ok(())
    }

    /// Appends a backend to an already registered tool. Duplicates are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFound`] when the tool is unknown.
    pub fn add_backend(&self, id: &str, backend: Backend) -> IndexResult<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let entry = inner.get_mut(id).ok_or_else(|| IndexError::not_found(id))?;
        if !entry.backends.contains(&backend) {
            entry.backends.push(backend);
        }
        Ok(())
    }

    /// Marks one of the tool's registered backends as its default.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFound`] when the tool is unknown and
    /// [`IndexError::InvalidRegistration`] when the backend is not registered
    /// for it.
    pub fn set_default_backend(&self, id: &str, backend: &Backend) -> IndexResult<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let entry = inner.get_mut(id).ok_or_else(|| IndexError::not_found(id))?;
        let position = entry
            .backends
            .iter()
            .position(|candidate| candidate == backend)
            .ok_or_else(|| IndexError::InvalidRegistration {
                reason: format!("backend `{backend}` is not registered for `{id}`"),
            })?;
        entry.default = position;
        Ok(())
    }

    /// Lists all registered tool definitions, sorted by canonical id.
    #[must_use]
    pub fn list(&self) -> Vec<Tool> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut tools: Vec<_> = inner.values().map(|entry| entry.tool.clone()).collect();
        tools.sort_by_key(Tool::id);
        tools
    }
}

impl ToolIndex for InMemoryIndex {
    fn get_tool(&self, id: &str) -> IndexResult<(Tool, Backend)> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let entry = inner.get(id).ok_or_else(|| IndexError::not_found(id))?;
        let backend = entry
            .backends
            .get(entry.default)
            .cloned()
            .ok_or_else(|| IndexError::unavailable(format!("tool `{id}` has no default backend")))?;
        Ok((entry.tool.clone(), backend))
    }

    fn get_all_backends(&self, id: &str) -> IndexResult<Vec<Backend>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .get(id)
            .map(|entry| entry.backends.clone())
            .ok_or_else(|| IndexError::not_found(id))
    }
}
