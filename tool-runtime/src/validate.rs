//! Schema validation of tool arguments and results.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use jsonschema::JSONSchema;
use serde_json::Value;
use thiserror::Error;
use tool_primitives::{Args, Tool};
use tracing::debug;

/// Result alias for validation.
pub type ValidationResult = Result<(), ValidationError>;

/// Validates call arguments and structured results against a tool's schemas.
pub trait SchemaValidator: Send + Sync {
    /// Validates `args` against the tool's input schema.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the arguments do not conform.
    fn validate_input(&self, tool: &Tool, args: &Args) -> ValidationResult;

    /// Validates `output` against the tool's output schema. Tools without an
    /// output schema always pass.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the value does not conform.
    fn validate_output(&self, tool: &Tool, output: &Value) -> ValidationResult;
}

/// Errors raised by schema validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The declared schema could not be compiled.
    #[error("tool `{tool_id}` declares an invalid schema: {reason}")]
    InvalidSchema {
        /// Canonical tool id.
        tool_id: String,
        /// Compiler message.
        reason: String,
    },

    /// The instance violated the schema.
    #[error("tool `{tool_id}` failed validation: {}", violations.join("; "))]
    Violations {
        /// Canonical tool id.
        tool_id: String,
        /// One message per violation.
        violations: Vec<String>,
    },
}

/// [`SchemaValidator`] backed by the `jsonschema` crate.
///
/// Compiled schemas are cached per tool id and recompiled when the tool's
/// declared schema changes.
#[derive(Default)]
pub struct JsonSchemaValidator {
    cache: RwLock<HashMap<(String, Slot), Compiled>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Slot {
    Input,
    Output,
}

struct Compiled {
    source: Value,
    schema: Arc<JSONSchema>,
}

impl JsonSchemaValidator {
    /// Creates a validator with an empty schema cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of compiled schemas currently cached.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn compiled(
        &self,
        tool: &Tool,
        slot: Slot,
        schema: &Value,
    ) -> Result<Arc<JSONSchema>, ValidationError> {
        let key = (tool.id(), slot);
        let cached = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .filter(|entry| entry.source == *schema)
            .map(|entry| entry.schema.clone());
        if let Some(schema) = cached {
            return Ok(schema);
        }

        let compiled =
            JSONSchema::compile(schema).map_err(|err| ValidationError::InvalidSchema {
                tool_id: tool.id(),
                reason: err.to_string(),
            })?;
        let compiled = Arc::new(compiled);
        debug!(tool_id = %key.0, slot = ?slot, "compiled schema");

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key,
                Compiled {
                    source: schema.clone(),
                    schema: compiled.clone(),
                },
            );
        Ok(compiled)
    }

    fn check(
        &self,
        tool: &Tool,
        slot: Slot,
        schema: &Value,
        instance: &Value,
    ) -> ValidationResult {
        if schema.is_null() {
            return Ok(());
        }

        let compiled = self.compiled(tool, slot, schema)?;
        compiled.validate(instance).map_err(|errors| {
            let violations = errors
                .map(|err| {
                    let path = err.instance_path.to_string();
                    if path.is_empty() {
                        err.to_string()
                    } else {
                        format!("{path}: {err}")
                    }
                })
                .collect();
            ValidationError::Violations {
                tool_id: tool.id(),
                violations,
            }
        })
    }
}

impl fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("cached", &self.cached())
            .finish()
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate_input(&self, tool: &Tool, args: &Args) -> ValidationResult {
        let instance = Value::Object(args.clone());
        self.check(tool, Slot::Input, tool.input_schema(), &instance)
    }

    fn validate_output(&self, tool: &Tool, output: &Value) -> ValidationResult {
        match tool.output_schema() {
            Some(schema) => self.check(tool, Slot::Output, schema, output),
            None => Ok(()),
        }
    }
}
