//! Fakes shared by the unit tests.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tool_index::{IndexResult, ToolIndex};
use tool_primitives::{Args, Backend, Tool};

use crate::executor::{
    BackendError, BackendResult, EventStream, ProviderExecutor, RemoteExecutor,
};
use crate::protocol::{CallRequest, ProtocolResult};
use crate::stream::StreamEvent;

pub(crate) fn tool(name: &str) -> Tool {
    Tool::builder(name).build().unwrap()
}

pub(crate) fn args(value: Value) -> Args {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

/// Index returning canned answers regardless of the id.
pub(crate) struct ScriptedIndex {
    tool: IndexResult<(Tool, Backend)>,
    backends: IndexResult<Vec<Backend>>,
}

impl ScriptedIndex {
    pub(crate) fn new(
        tool: IndexResult<(Tool, Backend)>,
        backends: IndexResult<Vec<Backend>>,
    ) -> Self {
        Self { tool, backends }
    }
}

impl ToolIndex for ScriptedIndex {
    fn get_tool(&self, _id: &str) -> IndexResult<(Tool, Backend)> {
        self.tool.clone()
    }

    fn get_all_backends(&self, _id: &str) -> IndexResult<Vec<Backend>> {
        self.backends.clone()
    }
}

/// How a fake executor answers streaming calls.
#[derive(Clone)]
pub(crate) enum StreamMode {
    Unsupported,
    Absent,
    Events(Vec<StreamEvent>),
}

impl StreamMode {
    fn open(&self) -> BackendResult<Option<EventStream>> {
        match self {
            Self::Unsupported => Err(BackendError::StreamNotSupported),
            Self::Absent => Ok(None),
            Self::Events(events) => Ok(Some(Box::pin(stream::iter(events.clone())))),
        }
    }
}

pub(crate) struct FakeRemote {
    reply: Result<ProtocolResult, String>,
    stream: StreamMode,
    calls: Mutex<Vec<(String, CallRequest)>>,
}

impl FakeRemote {
    pub(crate) fn replying(reply: ProtocolResult) -> Self {
        Self {
            reply: Ok(reply),
            stream: StreamMode::Unsupported,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(reason: &str) -> Self {
        Self {
            reply: Err(reason.to_owned()),
            ..Self::replying(ProtocolResult::default())
        }
    }

    pub(crate) fn with_stream(mut self, stream: StreamMode) -> Self {
        self.stream = stream;
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, CallRequest)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, server: &str, request: CallRequest) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((server.to_owned(), request));
    }
}

#[async_trait]
impl RemoteExecutor for FakeRemote {
    async fn call_tool(
        &self,
        _cancel: &CancellationToken,
        server: &str,
        request: CallRequest,
    ) -> BackendResult<ProtocolResult> {
        self.record(server, request);
        self.reply.clone().map_err(BackendError::call)
    }

    async fn call_tool_stream(
        &self,
        _cancel: &CancellationToken,
        server: &str,
        request: CallRequest,
    ) -> BackendResult<Option<EventStream>> {
        self.record(server, request);
        self.stream.open()
    }
}

pub(crate) struct FakeProvider {
    reply: Result<Value, String>,
    stream: StreamMode,
    calls: Mutex<Vec<(String, String, Args)>>,
}

impl FakeProvider {
    pub(crate) fn replying(reply: Value) -> Self {
        Self {
            reply: Ok(reply),
            stream: StreamMode::Unsupported,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_stream(mut self, stream: StreamMode) -> Self {
        self.stream = stream;
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, String, Args)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ProviderExecutor for FakeProvider {
    async fn call_tool(
        &self,
        _cancel: &CancellationToken,
        provider_id: &str,
        tool_id: &str,
        args: Args,
    ) -> BackendResult<Value> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((provider_id.to_owned(), tool_id.to_owned(), args));
        self.reply.clone().map_err(BackendError::call)
    }

    async fn call_tool_stream(
        &self,
        _cancel: &CancellationToken,
        _provider_id: &str,
        _tool_id: &str,
        _args: Args,
    ) -> BackendResult<Option<EventStream>> {
        self.stream.open()
    }
}
