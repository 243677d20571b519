//! Demonstrates single runs, a threaded chain with progress, and streaming.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use futures::StreamExt;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use toolrun::index::{HandlerError, HandlerRegistry, InMemoryIndex};
use toolrun::primitives::{Args, Backend, Tool};
use toolrun::runtime::{
    BackendResult, CallRequest, ChainStep, DefaultRunner, EventStream, PREVIOUS_KEY,
    ProgressRunner, ProtocolResult, ProviderExecutor, RemoteExecutor, Runner, RunnerSettings,
    StreamEvent,
};
use toolrun::telemetry::{self, TelemetryConfig};
use tracing::info;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Demo {
    Single,
    Chain,
    Stream,
    All,
}

#[derive(Debug, Parser)]
#[command(about = "Run the toolrun demo pipeline")]
struct Cli {
    /// Which demo to run.
    #[arg(long, value_enum, default_value_t = Demo::All)]
    demo: Demo,

    /// Number of rows produced by the fetch step.
    #[arg(long, default_value_t = 5)]
    rows: u64,

    /// Number of chunks emitted by the streaming server.
    #[arg(long, default_value_t = 3)]
    chunks: u64,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Provider that reports canned weather.
struct WeatherProvider;

#[async_trait]
impl ProviderExecutor for WeatherProvider {
    async fn call_tool(
        &self,
        _cancel: &CancellationToken,
        provider_id: &str,
        tool_id: &str,
        args: Args,
    ) -> BackendResult<Value> {
        let city = args.get("city").and_then(Value::as_str).unwrap_or("nowhere");
        Ok(json!({ "provider": provider_id, "tool": tool_id, "city": city, "celsius": 21 }))
    }
}

/// Remote server simulation that streams numbered chunks.
struct TickerServer {
    chunks: u64,
}

#[async_trait]
impl RemoteExecutor for TickerServer {
    async fn call_tool(
        &self,
        _cancel: &CancellationToken,
        _server: &str,
        request: CallRequest,
    ) -> BackendResult<ProtocolResult> {
        Ok(ProtocolResult::text(format!("{} acknowledged", request.name)))
    }

    async fn call_tool_stream(
        &self,
        _cancel: &CancellationToken,
        server: &str,
        _request: CallRequest,
    ) -> BackendResult<Option<EventStream>> {
        let server = server.to_owned();
        let total = self.chunks;
        let ticks = futures::stream::iter(1..=total).then(move |n| {
            let server = server.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                StreamEvent::chunk(json!({ "server": server, "tick": n }))
            }
        });
        let done = futures::stream::once(async move { StreamEvent::done(json!({ "ticks": total })) });
        Ok(Some(Box::pin(ticks.chain(done))))
    }
}

fn register_tools(index: &InMemoryIndex, handlers: &HandlerRegistry, rows: u64) -> Result<()> {
    index.register(
        Tool::builder("fetch")
            .namespace("etl")
            .description("Produces raw rows")
            .build()?,
        vec![Backend::local("etl.fetch")],
    )?;
    handlers.register("etl.fetch", move |_: Args| async move {
        let values: Vec<u64> = (1..=rows).rev().collect();
        Ok(json!({ "rows": values }))
    })?;

    index.register(
        Tool::builder("transform")
            .namespace("etl")
            .description("Sorts and doubles rows")
            .build()?,
        vec![Backend::local("etl.transform")],
    )?;
    handlers.register("etl.transform", |args: Args| async move {
        let mut values: Vec<u64> = args
            .get(PREVIOUS_KEY)
            .and_then(|previous| previous.get("rows"))
            .and_then(Value::as_array)
            .ok_or_else(|| HandlerError::invalid_arguments("expected previous rows"))?
            .iter()
            .filter_map(Value::as_u64)
            .map(|n| n * 2)
            .collect();
        values.sort_unstable();
        Ok::<_, HandlerError>(json!({ "rows": values }))
    })?;

    index.register(
        Tool::builder("store")
            .namespace("etl")
            .description("Persists rows")
            .output_schema(json!({
                "type": "object",
                "properties": { "stored": { "type": "integer" } },
                "required": ["stored"]
            }))
            .build()?,
        vec![Backend::local("etl.store")],
    )?;
    handlers.register("etl.store", |args: Args| async move {
        let stored = args
            .get(PREVIOUS_KEY)
            .and_then(|previous| previous.get("rows"))
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        Ok(json!({ "stored": stored }))
    })?;

    index.register(
        Tool::builder("forecast")
            .namespace("weather")
            .input_schema(json!({
                "type": "object",
                "properties": { "city": { "type": "string" } },
                "required": ["city"]
            }))
            .build()?,
        vec![
            Backend::remote("weather-server"),
            Backend::provider("meteo", "meteo.forecast"),
        ],
    )?;

    index.register(
        Tool::builder("ticker").namespace("feed").build()?,
        vec![Backend::remote("ticker-server")],
    )?;

    Ok(())
}

async fn single(runner: &DefaultRunner, cancel: &CancellationToken) -> Result<()> {
    info!("--- single run ---");
    let mut args = Args::new();
    args.insert("city".into(), json!("Lisbon"));

    let result = runner
        .run_with_progress(
            cancel,
            "weather:forecast",
            args,
            Some(&telemetry::progress_logger("forecast")),
        )
        .await?;
    info!(backend = %result.backend(), structured = %result.structured(), "forecast finished");
    Ok(())
}

async fn chain(runner: &DefaultRunner, cancel: &CancellationToken) -> Result<()> {
    info!("--- chain ---");
    let steps = [
        ChainStep::new("etl:fetch"),
        ChainStep::new("etl:transform").use_previous(),
        ChainStep::new("etl:store").use_previous(),
    ];

    let output = runner
        .run_chain_with_progress(cancel, &steps, Some(&telemetry::progress_logger("etl")))
        .await?;
    for step in &output.steps {
        let structured = step
            .result
            .as_ref()
            .map_or(Value::Null, |result| result.structured().clone());
        info!(tool_id = %step.tool_id, structured = %structured, "step");
    }
    let last = output.result.context("chain produced no result")?;
    info!(structured = %last.structured(), "chain finished");
    Ok(())
}

async fn stream(runner: &DefaultRunner, cancel: &CancellationToken) -> Result<()> {
    info!("--- stream ---");
    let mut events = runner.run_stream(cancel, "feed:ticker", Args::new()).await?;
    let mut received = 0_usize;
    while let Some(event) = events.next().await {
        telemetry::log_stream_event(&event);
        received += 1;
    }
    info!(received, "stream finished");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(&TelemetryConfig::from_verbosity(cli.verbose.saturating_add(1)))?;

    let index = InMemoryIndex::new();
    let handlers = HandlerRegistry::new();
    register_tools(&index, &handlers, cli.rows)?;

    let runner = DefaultRunner::builder()
        .with_settings(RunnerSettings::from_env()?)
        .with_index(Arc::new(index))
        .with_local_registry(Arc::new(handlers))
        .with_provider_executor(Arc::new(WeatherProvider))
        .with_remote_executor(Arc::new(TickerServer { chunks: cli.chunks }))
        .build();
    info!(config = ?runner.config(), "runner ready");

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    match cli.demo {
        Demo::Single => single(&runner, &cancel).await?,
        Demo::Chain => chain(&runner, &cancel).await?,
        Demo::Stream => stream(&runner, &cancel).await?,
        Demo::All => {
            single(&runner, &cancel).await?;
            chain(&runner, &cancel).await?;
            stream(&runner, &cancel).await?;
        }
    }

    Ok(())
}
