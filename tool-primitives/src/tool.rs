//! Tool definitions consumed by the execution runtime.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::ids::ToolId;

/// Arguments passed to a tool invocation.
pub type Args = Map<String, Value>;

/// Schema-described callable operation.
///
/// Definitions are owned by the registry and treated as immutable once they
/// have been resolved for a call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default = "default_input_schema")]
    input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_schema: Option<Value>,
}

fn default_input_schema() -> Value {
    json!({ "type": "object" })
}

impl Tool {
    /// Starts building a tool definition with the supplied bare name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ToolBuilder {
        ToolBuilder {
            name: name.into(),
            namespace: None,
            description: None,
            input_schema: default_input_schema(),
            output_schema: None,
        }
    }

    /// Returns the bare tool name (without namespace).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the optional namespace.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the optional human-readable description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the JSON schema describing accepted arguments.
    #[must_use]
    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Returns the JSON schema describing the structured output, if declared.
    #[must_use]
    pub fn output_schema(&self) -> Option<&Value> {
        self.output_schema.as_ref()
    }

    /// Returns the canonical identifier (`namespace:name` or `name`).
    #[must_use]
    pub fn id(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}:{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Returns the canonical identifier as a parsed [`ToolId`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToolId`] when the definition was deserialized
    /// from data with a malformed name or namespace.
    pub fn tool_id(&self) -> Result<ToolId> {
        ToolId::new(self.namespace.as_deref(), self.name.clone())
    }
}

/// Builder for [`Tool`].
#[derive(Debug)]
pub struct ToolBuilder {
    name: String,
    namespace: Option<String>,
    description: Option<String>,
    input_schema: Value,
    output_schema: Option<Value>,
}

impl ToolBuilder {
    /// Sets the namespace that prefixes the canonical identifier.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replaces the input schema.
    #[must_use]
    pub fn input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Declares an output schema.
    #[must_use]
    pub fn output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Finalises the tool definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToolId`] if the name or namespace cannot form a
    /// canonical identifier, or [`Error::InvalidTool`] if the input schema is
    /// not a JSON object.
    pub fn build(self) -> Result<Tool> {
        ToolId::new(self.namespace.as_deref(), self.name.clone())?;

        if !self.input_schema.is_object() {
            return Err(Error::InvalidTool {
                reason: "input schema must be a JSON object".into(),
            });
        }

        Ok(Tool {
            name: self.name,
            namespace: self.namespace.filter(|ns| !ns.is_empty()),
            description: self.description,
            input_schema: self.input_schema,
            output_schema: self.output_schema,
        })
    }
}
