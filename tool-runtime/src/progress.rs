//! Progress reporting around runs and chains.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tool_primitives::Args;

use crate::chain::{ChainError, ChainOutput, ChainStep, execute_chain};
use crate::error::RuntimeResult;
use crate::result::RunResult;
use crate::runner::Runner;

/// Observability event; it never influences execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Completed units of work.
    pub progress: u64,
    /// Declared total units of work.
    pub total: u64,
    /// Optional label for the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(progress: u64, total: u64, message: impl Into<String>) -> Self {
        Self {
            progress,
            total,
            message: Some(message.into()),
        }
    }
}

/// Callback receiving progress events, invoked synchronously and in order.
pub type ProgressCallback<'a> = &'a (dyn Fn(ProgressEvent) + Send + Sync);

fn emit(callback: Option<ProgressCallback<'_>>, progress: u64, total: u64, message: &str) {
    if let Some(callback) = callback {
        callback(ProgressEvent::new(progress, total, message));
    }
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

/// Progress-reporting variants of [`Runner`] operations.
///
/// Implemented for every [`Runner`].
#[async_trait]
pub trait ProgressRunner: Send + Sync {
    /// Runs one tool, reporting a start event (`0/1`) and an end event
    /// (`1/1`) whether or not the run succeeds.
    ///
    /// # Errors
    ///
    /// Same as [`Runner::run`].
    async fn run_with_progress(
        &self,
        cancel: &CancellationToken,
        tool_id: &str,
        args: Args,
        on_progress: Option<ProgressCallback<'_>>,
    ) -> RuntimeResult<RunResult>;

    /// Runs a chain, reporting a start event (`0/N`) and one event per
    /// completed step (`i/N`). A failed chain ends with an `N/N` event and an
    /// empty chain with a second `0/0`.
    ///
    /// # Errors
    ///
    /// Same as [`Runner::run_chain`].
    async fn run_chain_with_progress(
        &self,
        cancel: &CancellationToken,
        steps: &[ChainStep],
        on_progress: Option<ProgressCallback<'_>>,
    ) -> Result<ChainOutput, ChainError>;
}

#[async_trait]
impl<R> ProgressRunner for R
where
    R: Runner + ?Sized,
{
    async fn run_with_progress(
        &self,
        cancel: &CancellationToken,
        tool_id: &str,
        args: Args,
        on_progress: Option<ProgressCallback<'_>>,
    ) -> RuntimeResult<RunResult> {
        emit(on_progress, 0, 1, "start");
        let outcome = self.run(cancel, tool_id, args).await;
        emit(
            on_progress,
            1,
            1,
            if outcome.is_ok() { "done" } else { "failed" },
        );
        outcome
    }

    async fn run_chain_with_progress(
        &self,
        cancel: &CancellationToken,
        steps: &[ChainStep],
        on_progress: Option<ProgressCallback<'_>>,
    ) -> Result<ChainOutput, ChainError> {
        let total = count(steps.len());
        emit(on_progress, 0, total, "start");

        let report = move |completed: usize| {
            let message = steps
                .get(completed.saturating_sub(1))
                .map_or("step", |step| step.tool_id.as_str());
            emit(on_progress, count(completed), total, message);
        };
        let outcome = execute_chain(self, cancel, steps, &report).await;

        if outcome.is_err() {
            emit(on_progress, total, total, "failed");
        } else if steps.is_empty() {
            emit(on_progress, 0, 0, "done");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex, PoisonError};

    use serde_json::{Value, json};
    use tool_index::{HandlerError, HandlerRegistry, InMemoryIndex};
    use tool_primitives::Backend;

    use crate::runner::DefaultRunner;
    use crate::testing::tool;

    fn runner() -> DefaultRunner {
        let index = InMemoryIndex::new();
        let handlers = HandlerRegistry::new();
        for name in ["one", "two"] {
            index.register(tool(name), vec![Backend::local(name)]).unwrap();
            handlers
                .register(name, |_: Args| async move { Ok(json!({ "ok": true })) })
                .unwrap();
        }
        index.register(tool("bad"), vec![Backend::local("bad")]).unwrap();
        handlers
            .register("bad", |_: Args| async move {
                Err::<Value, _>(HandlerError::execution("nope"))
            })
            .unwrap();

        DefaultRunner::builder()
            .with_index(Arc::new(index))
            .with_local_registry(Arc::new(handlers))
            .build()
    }

    fn recorder() -> (Arc<Mutex<Vec<ProgressEvent>>>, impl Fn(ProgressEvent) + Send + Sync) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        (events, move |event: ProgressEvent| {
            sink.lock().unwrap_or_else(PoisonError::into_inner).push(event);
        })
    }

    fn counters(events: &Mutex<Vec<ProgressEvent>>) -> Vec<(u64, u64)> {
        events
            .lock()
            .unwrap()
            .iter()
            .map(|e| (e.progress, e.total))
            .collect()
    }

    #[tokio::test]
    async fn single_run_reports_start_and_end() {
        let (events, callback) = recorder();
        runner()
            .run_with_progress(&CancellationToken::new(), "one", Args::new(), Some(&callback))
            .await
            .unwrap();
        assert_eq!(counters(&events), vec![(0, 1), (1, 1)]);
    }

    #[tokio::test]
    async fn failed_run_still_reports_end() {
        let (events, callback) = recorder();
        runner()
            .run_with_progress(&CancellationToken::new(), "bad", Args::new(), Some(&callback))
            .await
            .expect_err("failure");
        assert_eq!(counters(&events), vec![(0, 1), (1, 1)]);
        assert_eq!(events.lock().unwrap()[1].message.as_deref(), Some("failed"));
    }

    #[tokio::test]
    async fn chain_reports_each_step() {
        let (events, callback) = recorder();
        runner()
            .run_chain_with_progress(
                &CancellationToken::new(),
                &[ChainStep::new("one"), ChainStep::new("two")],
                Some(&callback),
            )
            .await
            .unwrap();
        assert_eq!(counters(&events), vec![(0, 2), (1, 2), (2, 2)]);
        assert_eq!(events.lock().unwrap()[2].message.as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn failed_chain_ends_at_total() {
        let (events, callback) = recorder();
        let err = runner()
            .run_chain_with_progress(
                &CancellationToken::new(),
                &[ChainStep::new("one"), ChainStep::new("bad"), ChainStep::new("two")],
                Some(&callback),
            )
            .await
            .expect_err("second step fails");
        assert_eq!(err.steps.len(), 2);
        assert_eq!(counters(&events), vec![(0, 3), (1, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn empty_chain_reports_start_and_end() {
        let (events, callback) = recorder();
        let output = runner()
            .run_chain_with_progress(&CancellationToken::new(), &[], Some(&callback))
            .await
            .unwrap();
        assert!(output.steps.is_empty());
        assert_eq!(counters(&events), vec![(0, 0), (0, 0)]);
        let messages: Vec<_> = events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.message.clone())
            .collect();
        assert_eq!(messages, vec![Some("start".into()), Some("done".into())]);
    }

    #[tokio::test]
    async fn absent_callback_is_skipped() {
        let output = runner()
            .run_chain_with_progress(&CancellationToken::new(), &[ChainStep::new("one")], None)
            .await
            .unwrap();
        assert_eq!(output.steps.len(), 1);
    }
}
