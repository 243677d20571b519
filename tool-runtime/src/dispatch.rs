//! Routing of validated calls to the backend-specific executors.

use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tool_primitives::{Args, Backend, BackendKind, Tool};
use tracing::debug;

use crate::config::RunnerConfig;
use crate::executor::{BackendError, EventStream};
use crate::protocol::{CallRequest, ProtocolResult};

/// Raw outcome of a dispatch: either a ready structured value or the
/// protocol result of a remote server, never both.
#[derive(Debug)]
pub(crate) enum Outcome {
    Structured(Value),
    Protocol(ProtocolResult),
}

/// Failures raised while routing a call to its backend.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No executor is configured for the backend kind.
    #[error("no {0} executor configured")]
    NotConfigured(BackendKind),

    /// The backend lacks an identifier the executor needs.
    #[error("{kind} backend has an empty {field}")]
    MissingTarget {
        /// Backend kind.
        kind: BackendKind,
        /// Name of the empty field.
        field: &'static str,
    },

    /// The local registry has no handler under the backend's name.
    #[error("local handler `{name}` not found")]
    HandlerNotFound {
        /// Handler name declared by the backend.
        name: String,
    },

    /// The backend kind never streams.
    #[error("{0} backends do not support streaming")]
    StreamNotSupported(BackendKind),

    /// The executor or handler failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl DispatchError {
    /// Returns `true` when the failure means streaming is unavailable.
    #[must_use]
    pub fn is_stream_not_supported(&self) -> bool {
        matches!(
            self,
            Self::StreamNotSupported(_) | Self::Backend(BackendError::StreamNotSupported)
        )
    }
}

fn require(kind: BackendKind, field: &'static str, value: &str) -> Result<(), DispatchError> {
    if value.is_empty() {
        return Err(DispatchError::MissingTarget { kind, field });
    }
    Ok(())
}

pub(crate) async fn dispatch(
    config: &RunnerConfig,
    cancel: &CancellationToken,
    tool: &Tool,
    backend: &Backend,
    args: Args,
) -> Result<Outcome, DispatchError> {
    match backend {
        Backend::Remote(remote) => {
            let executor = config
                .remote
                .as_ref()
                .ok_or(DispatchError::NotConfigured(BackendKind::Remote))?;
            require(BackendKind::Remote, "server", remote.server())?;

            let request = CallRequest {
                name: tool.name().to_owned(),
                arguments: args,
            };
            debug!(server = remote.server(), tool = %request.name, "calling remote tool");
            let result = executor.call_tool(cancel, remote.server(), request).await?;
            Ok(Outcome::Protocol(result))
        }
        Backend::Provider(provider) => {
            let executor = config
                .provider
                .as_ref()
                .ok_or(DispatchError::NotConfigured(BackendKind::Provider))?;
            require(BackendKind::Provider, "provider_id", provider.provider_id())?;
            require(BackendKind::Provider, "tool_id", provider.tool_id())?;

            debug!(
                provider = provider.provider_id(),
                provider_tool = provider.tool_id(),
                "calling provider tool"
            );
            let value = executor
                .call_tool(cancel, provider.provider_id(), provider.tool_id(), args)
                .await?;
            Ok(Outcome::Structured(value))
        }
        Backend::Local(local) => {
            let registry = config
                .local
                .as_ref()
                .ok_or(DispatchError::NotConfigured(BackendKind::Local))?;
            let handler = registry
                .get(local.name())
                .ok_or_else(|| DispatchError::HandlerNotFound {
                    name: local.name().to_owned(),
                })?;

            debug!(handler = local.name(), "invoking local handler");
            let value = handler
                .invoke(cancel.clone(), args)
                .await
                .map_err(BackendError::from)?;
            Ok(Outcome::Structured(value))
        }
    }
}

/// Opens a stream on the backend. `Ok(None)` means the executor reported no
/// error but produced no stream.
pub(crate) async fn dispatch_stream(
    config: &RunnerConfig,
    cancel: &CancellationToken,
    tool: &Tool,
    backend: &Backend,
    args: Args,
) -> Result<Option<EventStream>, DispatchError> {
    match backend {
        Backend::Remote(remote) => {
            let executor = config
                .remote
                .as_ref()
                .ok_or(DispatchError::NotConfigured(BackendKind::Remote))?;
            require(BackendKind::Remote, "server", remote.server())?;

            let request = CallRequest {
                name: tool.name().to_owned(),
                arguments: args,
            };
            Ok(executor
                .call_tool_stream(cancel, remote.server(), request)
                .await?)
        }
        Backend::Provider(provider) => {
            let executor = config
                .provider
                .as_ref()
                .ok_or(DispatchError::NotConfigured(BackendKind::Provider))?;
            require(BackendKind::Provider, "provider_id", provider.provider_id())?;
            require(BackendKind::Provider, "tool_id", provider.tool_id())?;

            Ok(executor
                .call_tool_stream(cancel, provider.provider_id(), provider.tool_id(), args)
                .await?)
        }
        Backend::Local(_) => Err(DispatchError::StreamNotSupported(BackendKind::Local)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use futures::StreamExt;
    use serde_json::json;
    use tool_index::{HandlerError, HandlerRegistry};

    use crate::config::RunnerBuilder;
    use crate::testing::{FakeProvider, FakeRemote, StreamMode, args, tool};
    use crate::stream::StreamEvent;

    fn namespaced() -> Tool {
        Tool::builder("search").namespace("web").build().unwrap()
    }

    #[tokio::test]
    async fn remote_uses_bare_tool_name() {
        let remote = Arc::new(FakeRemote::replying(ProtocolResult::text("ok")));
        let cfg = RunnerBuilder::new()
            .with_remote_executor(remote.clone())
            .build()
            .config()
            .clone();

        let outcome = dispatch(
            &cfg,
            &CancellationToken::new(),
            &namespaced(),
            &Backend::remote("srv"),
            args(json!({ "q": "rust" })),
        )
        .await
        .unwrap();

        assert!(matches!(outcome, Outcome::Protocol(_)));
        let calls = remote.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "srv");
        assert_eq!(calls[0].1.name, "search");
        assert_eq!(calls[0].1.arguments, args(json!({ "q": "rust" })));
    }

    #[tokio::test]
    async fn provider_uses_backend_identifiers() {
        let provider = Arc::new(FakeProvider::replying(json!({ "hits": 3 })));
        let cfg = RunnerBuilder::new()
            .with_provider_executor(provider.clone())
            .build()
            .config()
            .clone();

        let outcome = dispatch(
            &cfg,
            &CancellationToken::new(),
            &namespaced(),
            &Backend::provider("acme", "acme.search"),
            Args::new(),
        )
        .await
        .unwrap();

        assert!(matches!(outcome, Outcome::Structured(v) if v == json!({ "hits": 3 })));
        let calls = provider.calls();
        assert_eq!(calls[0].0, "acme");
        assert_eq!(calls[0].1, "acme.search");
    }

    #[tokio::test]
    async fn local_invokes_named_handler() {
        let registry = HandlerRegistry::new();
        registry
            .register("double", |input: Args| async move {
                let n = input.get("n").and_then(Value::as_i64).unwrap_or_default();
                Ok(json!(n * 2))
            })
            .unwrap();
        let cfg = RunnerBuilder::new()
            .with_local_registry(Arc::new(registry))
            .build()
            .config()
            .clone();

        let outcome = dispatch(
            &cfg,
            &CancellationToken::new(),
            &tool("double"),
            &Backend::local("double"),
            args(json!({ "n": 21 })),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, Outcome::Structured(v) if v == json!(42)));

        let err = dispatch(
            &cfg,
            &CancellationToken::new(),
            &tool("double"),
            &Backend::local("missing"),
            Args::new(),
        )
        .await
        .expect_err("missing handler");
        assert!(matches!(err, DispatchError::HandlerNotFound { name } if name == "missing"));
    }

    #[tokio::test]
    async fn handler_errors_propagate() {
        let registry = HandlerRegistry::new();
        registry
            .register("fail", |_: Args| async move {
                Err::<Value, _>(HandlerError::execution("disk full"))
            })
            .unwrap();
        let cfg = RunnerBuilder::new()
            .with_local_registry(Arc::new(registry))
            .build()
            .config()
            .clone();

        let err = dispatch(
            &cfg,
            &CancellationToken::new(),
            &tool("fail"),
            &Backend::local("fail"),
            Args::new(),
        )
        .await
        .expect_err("handler failure");
        assert!(err.to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn missing_configuration_and_targets_fail() {
        let cfg = RunnerBuilder::new().build().config().clone();
        let cancel = CancellationToken::new();

        for backend in [
            Backend::remote("srv"),
            Backend::provider("p", "t"),
            Backend::local("h"),
        ] {
            let err = dispatch(&cfg, &cancel, &tool("t"), &backend, Args::new())
                .await
                .expect_err("not configured");
            assert!(matches!(err, DispatchError::NotConfigured(kind) if kind == backend.kind()));
        }

        let cfg = RunnerBuilder::new()
            .with_remote_executor(Arc::new(FakeRemote::replying(ProtocolResult::default())))
            .with_provider_executor(Arc::new(FakeProvider::replying(Value::Null)))
            .build()
            .config()
            .clone();

        let err = dispatch(&cfg, &cancel, &tool("t"), &Backend::remote(""), Args::new())
            .await
            .expect_err("empty server");
        assert!(matches!(err, DispatchError::MissingTarget { field: "server", .. }));

        let err = dispatch(&cfg, &cancel, &tool("t"), &Backend::provider("p", ""), Args::new())
            .await
            .expect_err("empty tool id");
        assert!(matches!(err, DispatchError::MissingTarget { field: "tool_id", .. }));
    }

    #[tokio::test]
    async fn streaming_paths() {
        let remote = Arc::new(
            FakeRemote::replying(ProtocolResult::default())
                .with_stream(StreamMode::Events(vec![StreamEvent::chunk(json!(1))])),
        );
        let provider = Arc::new(FakeProvider::replying(Value::Null).with_stream(StreamMode::Absent));
        let cfg = RunnerBuilder::new()
            .with_remote_executor(remote)
            .with_provider_executor(provider)
            .with_local_registry(Arc::new(HandlerRegistry::new()))
            .build()
            .config()
            .clone();
        let cancel = CancellationToken::new();

        let stream = dispatch_stream(&cfg, &cancel, &tool("t"), &Backend::remote("srv"), Args::new())
            .await
            .unwrap()
            .expect("stream");
        assert_eq!(stream.collect::<Vec<_>>().await.len(), 1);

        let absent = dispatch_stream(&cfg, &cancel, &tool("t"), &Backend::provider("p", "t"), Args::new())
            .await
            .unwrap();
        assert!(absent.is_none());

        let err = dispatch_stream(&cfg, &cancel, &tool("t"), &Backend::local("h"), Args::new())
            .await
            .err()
            .expect("local streaming");
        assert!(err.is_stream_not_supported());
    }
}
