//! Stream events and the bridge that forwards them to callers.

use std::error::Error as StdError;
use std::sync::Arc;
use std::task::Poll;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::executor::EventStream;

/// Kind tag of a [`StreamEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventKind {
    /// Intermediate progress notification.
    Progress,
    /// Partial output.
    Chunk,
    /// Final event of a successful stream.
    Done,
    /// The stream failed.
    Error,
}

/// Event emitted during streaming execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    /// Kind of event.
    pub kind: StreamEventKind,
    /// Canonical id of the tool that produced the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<String>,
    /// Event payload.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    /// Failure detail for [`StreamEventKind::Error`] events. Never serialized.
    #[serde(skip)]
    pub error: Option<Arc<dyn StdError + Send + Sync>>,
}

impl StreamEvent {
    fn with_kind(kind: StreamEventKind, data: Value) -> Self {
        Self {
            kind,
            tool_id: None,
            data,
            error: None,
        }
    }

    /// Creates a progress event.
    #[must_use]
    pub fn progress(data: Value) -> Self {
        Self::with_kind(StreamEventKind::Progress, data)
    }

    /// Creates a chunk event.
    #[must_use]
    pub fn chunk(data: Value) -> Self {
        Self::with_kind(StreamEventKind::Chunk, data)
    }

    /// Creates a done event.
    #[must_use]
    pub fn done(data: Value) -> Self {
        Self::with_kind(StreamEventKind::Done, data)
    }

    /// Creates an error event carrying `error` out of band.
    #[must_use]
    pub fn error<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            error: Some(Arc::new(error)),
            ..Self::with_kind(StreamEventKind::Error, Value::Null)
        }
    }

    /// Sets the tool id.
    #[must_use]
    pub fn with_tool_id(mut self, tool_id: impl Into<String>) -> Self {
        self.tool_id = Some(tool_id.into());
        self
    }

    /// Returns `true` for error events.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == StreamEventKind::Error
    }
}

/// Forwards `raw` onto a bounded channel from a single spawned task.
///
/// Events without a tool id are stamped with `tool_id`. Forwarding stops as
/// soon as the raw stream ends, the consumer drops the returned stream, or
/// `cancel` fires; in the last case nothing buffered is delivered.
pub(crate) fn bridge(
    mut raw: EventStream,
    tool_id: String,
    cancel: CancellationToken,
    capacity: usize,
) -> EventStream {
    let (tx, mut rx) = mpsc::channel::<StreamEvent>(capacity.max(1));
    let task_cancel = cancel.clone();

    tokio::spawn(async move {
        let mut forwarded = 0_usize;
        loop {
            let mut event = tokio::select! {
                biased;
                () = task_cancel.cancelled() => {
                    debug!(tool_id = %tool_id, forwarded, "stream bridge cancelled");
                    break;
                }
                () = tx.closed() => {
                    debug!(tool_id = %tool_id, forwarded, "stream consumer went away");
                    break;
                }
                next = raw.next() => match next {
                    Some(event) => event,
                    None => {
                        debug!(tool_id = %tool_id, forwarded, "upstream stream closed");
                        break;
                    }
                },
            };

            if event.tool_id.as_deref().is_none_or(str::is_empty) {
                event.tool_id = Some(tool_id.clone());
            }

            tokio::select! {
                biased;
                () = task_cancel.cancelled() => {
                    debug!(tool_id = %tool_id, forwarded, "stream bridge cancelled during send");
                    break;
                }
                sent = tx.send(event) => {
                    if sent.is_err() {
                        debug!(tool_id = %tool_id, forwarded, "stream consumer went away");
                        break;
                    }
                    forwarded += 1;
                }
            }
        }
    });

    Box::pin(futures::stream::poll_fn(move |cx| {
        if cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        rx.poll_recv(cx)
    }))
}
