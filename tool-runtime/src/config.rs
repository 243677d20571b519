//! Runner configuration and builder.

use std::env;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tool_index::{LocalRegistry, ToolIndex};
use tool_primitives::{Backend, Tool};

use crate::executor::{ProviderExecutor, RemoteExecutor};
use crate::runner::DefaultRunner;
use crate::select::{BackendSelector, PrioritySelector};
use crate::validate::{JsonSchemaValidator, SchemaValidator};

/// Environment variable toggling input validation.
pub const VALIDATE_INPUT_ENV: &str = "TOOLRUN_VALIDATE_INPUT";
/// Environment variable toggling output validation.
pub const VALIDATE_OUTPUT_ENV: &str = "TOOLRUN_VALIDATE_OUTPUT";
/// Environment variable setting the stream channel capacity.
pub const STREAM_BUFFER_ENV: &str = "TOOLRUN_STREAM_BUFFER";

const DEFAULT_STREAM_BUFFER: usize = 1;

/// Fallback used when the index does not know a tool.
pub type ToolResolverFn = Arc<dyn Fn(&str) -> anyhow::Result<Tool> + Send + Sync>;

/// Fallback used when no backend list could be obtained from the index.
pub type BackendsResolverFn = Arc<dyn Fn(&str) -> anyhow::Result<Vec<Backend>> + Send + Sync>;

/// Errors raised while loading [`RunnerSettings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The JSON document could not be parsed.
    #[error("invalid runner settings: {0}")]
    Json(#[from] serde_json::Error),

    /// An environment variable held an unusable value.
    #[error("invalid value `{value}` for {key}")]
    InvalidEnv {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Plain-data runner settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunnerSettings {
    /// Validate arguments against the input schema before dispatch.
    pub validate_input: bool,
    /// Validate structured results against the output schema.
    pub validate_output: bool,
    /// Capacity of the channel behind each outward event stream.
    pub stream_buffer: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            validate_input: true,
            validate_output: true,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }
}

impl RunnerSettings {
    /// Parses settings from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Json`] for malformed input.
    pub fn from_json(raw: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reads settings from the `TOOLRUN_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidEnv`] when a variable cannot be parsed.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through `lookup`, starting from the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidEnv`] when a value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(value) = lookup(VALIDATE_INPUT_ENV) {
            settings.validate_input = parse_flag(VALIDATE_INPUT_ENV, value)?;
        }
        if let Some(value) = lookup(VALIDATE_OUTPUT_ENV) {
            settings.validate_output = parse_flag(VALIDATE_OUTPUT_ENV, value)?;
        }
        if let Some(value) = lookup(STREAM_BUFFER_ENV) {
            settings.stream_buffer = match value.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => capacity,
                _ => {
                    return Err(SettingsError::InvalidEnv {
                        key: STREAM_BUFFER_ENV,
                        value,
                    });
                }
            };
        }
        Ok(settings)
    }
}

fn parse_flag(key: &'static str, value: String) -> Result<bool, SettingsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SettingsError::InvalidEnv { key, value }),
    }
}

/// Immutable collaborators and settings shared by every call of a runner.
#[derive(Clone)]
pub struct RunnerConfig {
    pub(crate) index: Option<Arc<dyn ToolIndex>>,
    pub(crate) tool_resolver: Option<ToolResolverFn>,
    pub(crate) backends_resolver: Option<BackendsResolverFn>,
    pub(crate) selector: Arc<dyn BackendSelector>,
    pub(crate) validator: Arc<dyn SchemaValidator>,
    pub(crate) settings: RunnerSettings,
    pub(crate) remote: Option<Arc<dyn RemoteExecutor>>,
    pub(crate) provider: Option<Arc<dyn ProviderExecutor>>,
    pub(crate) local: Option<Arc<dyn LocalRegistry>>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            index: None,
            tool_resolver: None,
            backends_resolver: None,
            selector: Arc::new(PrioritySelector),
            validator: Arc::new(JsonSchemaValidator::new()),
            settings: RunnerSettings::default(),
            remote: None,
            provider: None,
            local: None,
        }
    }
}

impl fmt::Debug for RunnerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerConfig")
            .field("index", &self.index.is_some())
            .field("tool_resolver", &self.tool_resolver.is_some())
            .field("backends_resolver", &self.backends_resolver.is_some())
            .field("settings", &self.settings)
            .field("remote", &self.remote.is_some())
            .field("provider", &self.provider.is_some())
            .field("local", &self.local.is_some())
            .finish_non_exhaustive()
    }
}

impl RunnerConfig {
    /// Returns the settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &RunnerSettings {
        &self.settings
    }
}

/// Builder for [`DefaultRunner`].
#[derive(Debug, Default)]
pub struct RunnerBuilder {
    config: RunnerConfig,
}

impl RunnerBuilder {
    /// Creates a builder with default settings and no collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the primary tool index.
    #[must_use]
    pub fn with_index(mut self, index: Arc<dyn ToolIndex>) -> Self {
        self.config.index = Some(index);
        self
    }

    /// Sets the fallback tool resolver.
    #[must_use]
    pub fn with_tool_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<Tool> + Send + Sync + 'static,
    {
        self.config.tool_resolver = Some(Arc::new(resolver));
        self
    }

    /// Sets the fallback backends resolver.
    #[must_use]
    pub fn with_backends_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<Vec<Backend>> + Send + Sync + 'static,
    {
        self.config.backends_resolver = Some(Arc::new(resolver));
        self
    }

    /// Replaces the backend selector.
    #[must_use]
    pub fn with_selector<S>(mut self, selector: S) -> Self
    where
        S: BackendSelector + 'static,
    {
        self.config.selector = Arc::new(selector);
        self
    }

    /// Replaces the schema validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.config.validator = validator;
        self
    }

    /// Replaces all settings at once.
    #[must_use]
    pub fn with_settings(mut self, settings: RunnerSettings) -> Self {
        self.config.settings = settings;
        self
    }

    /// Toggles input validation.
    #[must_use]
    pub fn with_input_validation(mut self, enabled: bool) -> Self {
        self.config.settings.validate_input = enabled;
        self
    }

    /// Toggles output validation.
    #[must_use]
    pub fn with_output_validation(mut self, enabled: bool) -> Self {
        self.config.settings.validate_output = enabled;
        self
    }

    /// Sets the capacity of outward stream channels. Zero is raised to one.
    #[must_use]
    pub fn with_stream_buffer(mut self, capacity: usize) -> Self {
        self.config.settings.stream_buffer = capacity.max(1);
        self
    }

    /// Sets the remote protocol executor.
    #[must_use]
    pub fn with_remote_executor(mut self, executor: Arc<dyn RemoteExecutor>) -> Self {
        self.config.remote = Some(executor);
        self
    }

    /// Sets the provider executor.
    #[must_use]
    pub fn with_provider_executor(mut self, executor: Arc<dyn ProviderExecutor>) -> Self {
        self.config.provider = Some(executor);
        self
    }

    /// Sets the local handler registry.
    #[must_use]
    pub fn with_local_registry(mut self, registry: Arc<dyn LocalRegistry>) -> Self {
        self.config.local = Some(registry);
        self
    }

    /// Finalises the runner.
    #[must_use]
    pub fn build(self) -> DefaultRunner {
        DefaultRunner::from_config(self.config)
    }
}
