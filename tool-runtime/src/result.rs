//! Canonical result of a successful run.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tool_primitives::{Backend, Tool};

use crate::protocol::ProtocolResult;

/// Outcome of a successful call.
///
/// `structured` is the backend-agnostic value; `protocol_result` keeps the
/// raw server reply and is only present for remote backends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    tool: Tool,
    backend: Backend,
    #[serde(default)]
    structured: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    protocol_result: Option<ProtocolResult>,
}

impl RunResult {
    pub(crate) fn new(
        tool: Tool,
        backend: Backend,
        structured: Value,
        protocol_result: Option<ProtocolResult>,
    ) -> Self {
        Self {
            tool,
            backend,
            structured,
            protocol_result,
        }
    }

    /// Returns the resolved tool definition.
    #[must_use]
    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    /// Returns the backend that served the call.
    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Returns the canonical structured value; `Null` when absent.
    #[must_use]
    pub fn structured(&self) -> &Value {
        &self.structured
    }

    /// Returns the raw protocol result, if the backend was remote.
    #[must_use]
    pub fn protocol_result(&self) -> Option<&ProtocolResult> {
        self.protocol_result.as_ref()
    }

    /// Consumes the result, returning the structured value.
    #[must_use]
    pub fn into_structured(self) -> Value {
        self.structured
    }
}
