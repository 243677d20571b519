//! Context-carrying error type surfaced by every runner operation.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use tool_primitives::Backend;

/// Result alias for runner operations.
pub type RuntimeResult<T> = Result<T, RunError>;

/// Shared, type-erased underlying cause.
pub type SharedError = Arc<dyn StdError + Send + Sync>;

/// Classification of a runner failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The cancellation signal fired before the work started.
    Cancelled,
    /// The tool identifier was empty.
    InvalidToolId,
    /// No tool definition could be resolved.
    ToolNotFound,
    /// A tool was found but no backend is available for it.
    NoBackends,
    /// The registry failed for a reason other than "not found".
    Registry,
    /// Arguments failed input schema validation.
    Validation,
    /// The structured result failed output schema validation.
    OutputValidation,
    /// The backend call failed.
    Execution,
    /// The selected backend cannot stream.
    StreamNotSupported,
}

impl ErrorKind {
    /// Returns a short human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Cancelled => "operation cancelled",
            Self::InvalidToolId => "invalid tool id",
            Self::ToolNotFound => "tool not found",
            Self::NoBackends => "no backends available",
            Self::Registry => "registry error",
            Self::Validation => "validation error",
            Self::OutputValidation => "output validation error",
            Self::Execution => "execution error",
            Self::StreamNotSupported => "streaming not supported",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Pipeline stage that produced an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Pre-flight cancellation check.
    Start,
    /// Tool identifier check.
    ValidateToolId,
    /// Tool and backend resolution.
    Resolve,
    /// Backend selection.
    SelectBackend,
    /// Input schema validation.
    ValidateInput,
    /// Single-shot backend dispatch.
    Execute,
    /// Streaming backend dispatch.
    Stream,
    /// Output schema validation.
    ValidateOutput,
}

impl Operation {
    /// Returns the stable operation label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::ValidateToolId => "validate_tool_id",
            Self::Resolve => "resolve",
            Self::SelectBackend => "select_backend",
            Self::ValidateInput => "validate_input",
            Self::Execute => "execute",
            Self::Stream => "stream",
            Self::ValidateOutput => "validate_output",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by the runner, carrying the tool id, the backend in use
/// (when known), the failing operation, and the underlying cause.
#[derive(Clone, Debug)]
pub struct RunError {
    kind: ErrorKind,
    tool_id: String,
    backend: Option<Backend>,
    operation: Operation,
    source: Option<SharedError>,
}

impl RunError {
    /// Creates an error without backend or cause.
    #[must_use]
    pub fn new(kind: ErrorKind, tool_id: impl Into<String>, operation: Operation) -> Self {
        Self {
            kind,
            tool_id: tool_id.into(),
            backend: None,
            operation,
            source: None,
        }
    }

    /// Attaches the backend that was in use.
    #[must_use]
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attaches the underlying cause.
    #[must_use]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the failure classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns `true` when the error has the supplied classification.
    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Returns the canonical tool identifier of the failing call.
    #[must_use]
    pub fn tool_id(&self) -> &str {
        &self.tool_id
    }

    /// Returns the backend in use when the failure happened, if known.
    #[must_use]
    pub fn backend(&self) -> Option<&Backend> {
        self.backend.as_ref()
    }

    /// Returns the failing operation.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    /// Returns the underlying cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&SharedError> {
        self.source.as_ref()
    }

    /// Attempts to downcast the underlying cause to a concrete error type.
    #[must_use]
    pub fn downcast_source<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.source.as_deref()?.downcast_ref::<E>()
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "toolrun: {} {}", self.operation, self.tool_id)?;
        if let Some(backend) = &self.backend {
            write!(f, " [{}]", backend.kind())?;
        }
        write!(f, ": {}", self.kind)?;
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for RunError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tool_index::IndexError;

    #[test]
    fn display_includes_context() {
        let err = RunError::new(ErrorKind::Execution, "myns:mytool", Operation::Execute)
            .with_backend(Backend::remote("server1"))
            .with_source(IndexError::unavailable("connection timeout"));

        let msg = err.to_string();
        assert!(msg.contains("myns:mytool"), "{msg}");
        assert!(msg.contains("execute"), "{msg}");
        assert!(msg.contains("[remote]"), "{msg}");
        assert!(msg.contains("connection timeout"), "{msg}");
    }

    #[test]
    fn display_without_backend() {
        let err = RunError::new(ErrorKind::ToolNotFound, "mytool", Operation::Resolve);
        assert_eq!(err.to_string(), "toolrun: resolve mytool: tool not found");
        assert!(err.backend().is_none());
    }

    #[test]
    fn exposes_cause_chain() {
        let err = RunError::new(ErrorKind::ToolNotFound, "mytool", Operation::Resolve)
            .with_source(IndexError::not_found("mytool"));

        assert!(err.is(ErrorKind::ToolNotFound));
        let source = StdError::source(&err).expect("source");
        assert!(source.to_string().contains("not found in index"));
        let index_err = err.downcast_source::<IndexError>().expect("downcast");
        assert!(index_err.is_not_found());
    }

    #[test]
    fn operation_labels_are_stable() {
        let labels: Vec<_> = [
            Operation::Start,
            Operation::ValidateToolId,
            Operation::Resolve,
            Operation::SelectBackend,
            Operation::ValidateInput,
            Operation::Execute,
            Operation::Stream,
            Operation::ValidateOutput,
        ]
        .iter()
        .map(|op| op.as_str())
        .collect();

        assert_eq!(
            labels,
            vec![
                "start",
                "validate_tool_id",
                "resolve",
                "select_backend",
                "validate_input",
                "execute",
                "stream",
                "validate_output"
            ]
        );
    }
}
