//! Logging bootstrap and tracing-backed observers for tool runs.
//!
//! [`init`] installs a `tracing-subscriber` formatter filtered by `RUST_LOG`
//! or the configured directive. [`progress_logger`] and [`log_stream_event`]
//! turn runtime callbacks into structured log records.

#![warn(missing_docs, clippy::pedantic)]

use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tool_runtime::{ProgressEvent, StreamEvent, StreamEventKind};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid filter directive `{directive}`: {reason}")]
    InvalidFilter {
        /// Directive that failed to parse.
        directive: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber is already installed.
    #[error("failed to install subscriber: {0}")]
    Install(String),
}

/// Subscriber settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit ANSI colours.
    pub ansi: bool,
    /// Include the event target in each line.
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            ansi: true,
            with_target: false,
        }
    }
}

impl TelemetryConfig {
    /// Creates settings with the supplied filter directive.
    #[must_use]
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            ..Self::default()
        }
    }

    /// Maps a `-v` count to a filter: warn, info, debug, then trace.
    #[must_use]
    pub fn from_verbosity(level: u8) -> Self {
        let filter = match level {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        Self::new(filter)
    }

    /// Enables or disables ANSI colours.
    #[must_use]
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Enables or disables event targets.
    #[must_use]
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }
}

fn build_filter(config: &TelemetryConfig, from_env: Option<String>) -> Result<EnvFilter, TelemetryError> {
    let directive = from_env
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| config.filter.clone());
    EnvFilter::try_new(&directive).map_err(|err| TelemetryError::InvalidFilter {
        reason: err.to_string(),
        directive,
    })
}

/// Installs the global `fmt` subscriber. `RUST_LOG` takes precedence over
/// [`TelemetryConfig::filter`].
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for unparsable directives and
/// [`TelemetryError::Install`] when a subscriber is already set.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config, env::var(EnvFilter::DEFAULT_ENV).ok())?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(config.with_target)
        .try_init()
        .map_err(|err| TelemetryError::Install(err.to_string()))
}

/// Returns a progress callback that logs each event at `info`.
pub fn progress_logger(label: impl Into<String>) -> impl Fn(ProgressEvent) + Send + Sync {
    let label = label.into();
    move |event: ProgressEvent| {
        info!(
            run = %label,
            progress = event.progress,
            total = event.total,
            detail = event.message.as_deref().unwrap_or_default(),
            "progress"
        );
    }
}

/// Logs a stream event; error events are logged at `warn` with their detail.
pub fn log_stream_event(event: &StreamEvent) {
    let tool_id = event.tool_id.as_deref().unwrap_or_default();
    match event.kind {
        StreamEventKind::Error => {
            let detail = event
                .error
                .as_ref()
                .map_or_else(|| "unknown".to_owned(), ToString::to_string);
            warn!(tool_id, error = %detail, "stream error");
        }
        kind => debug!(tool_id, kind = ?kind, data = %event.data, "stream event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;
    use std::sync::{Arc, Mutex, PoisonError};

    use serde_json::json;

    #[test]
    fn verbosity_maps_to_levels() {
        let filters: Vec<_> = (0..4)
            .map(|level| TelemetryConfig::from_verbosity(level).filter)
            .collect();
        assert_eq!(filters, vec!["warn", "info", "debug", "trace"]);
    }

    #[test]
    fn env_directive_overrides_config() {
        let config = TelemetryConfig::new("info");
        let filter = build_filter(&config, Some("tool_runtime=debug".into())).unwrap();
        assert!(filter.to_string().contains("tool_runtime=debug"));

        let filter = build_filter(&config, Some("  ".into())).unwrap();
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn bad_directive_is_rejected() {
        let config = TelemetryConfig::new("tool_runtime=loud");
        let err = build_filter(&config, None).expect_err("invalid level");
        assert!(matches!(err, TelemetryError::InvalidFilter { directive, .. } if directive == "tool_runtime=loud"));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: TelemetryConfig = serde_json::from_value(json!({ "filter": "debug" })).unwrap();
        assert_eq!(config, TelemetryConfig::new("debug"));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn observers_log_progress_and_stream_errors() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let log = progress_logger("demo");
            log(ProgressEvent::new(1, 2, "fetch"));
            log_stream_event(&StreamEvent::chunk(json!("x")).with_tool_id("t"));
            log_stream_event(&StreamEvent::error(io::Error::other("boom")).with_tool_id("t"));
        });

        let lines: Vec<_> = captured.text().lines().map(str::to_owned).collect();
        assert_eq!(lines.len(), 3, "{lines:?}");

        assert!(lines[0].contains("INFO"), "{}", lines[0]);
        assert!(lines[0].contains("progress"), "{}", lines[0]);
        assert!(lines[0].contains("run=demo"), "{}", lines[0]);
        assert!(lines[0].contains("progress=1"), "{}", lines[0]);
        assert!(lines[0].contains("total=2"), "{}", lines[0]);

        assert!(lines[1].contains("DEBUG"), "{}", lines[1]);
        assert!(lines[1].contains("stream event"), "{}", lines[1]);

        assert!(lines[2].contains("WARN"), "{}", lines[2]);
        assert!(lines[2].contains("stream error"), "{}", lines[2]);
        assert!(lines[2].contains("error=boom"), "{}", lines[2]);
        assert!(lines[2].contains("tool_id=\"t\""), "{}", lines[2]);
    }
}
