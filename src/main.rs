// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! `tqld`: the CLI entry point (§10). Parses a TQL pipeline string, composes and type-checks it
//! against the builtin operator registry, runs it on the streaming runtime, and serves the HTTP
//! control plane alongside it until the pipeline completes.

use std::borrow::Cow;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tql_df_config::PipelineSettings;
use tql_df_diagnostics::DiagnosticSession;
use tql_df_engine::RuntimePipeline;
use tql_df_telemetry::{router, AppState, ChannelMetricsSink, MetricsCollector};
use tracing::{error, info};

/// A pipeline-first security data engine: node, HTTP control plane, and CLI entry point.
#[derive(Parser, Debug)]
#[command(name = "tqld", version, about)]
struct Cli {
    /// TQL pipeline source to run, e.g. `from events.json | where severity > 3 | head 10`.
    pipeline: String,

    /// Identifier this run is tagged with in diagnostics and metrics.
    #[arg(long, default_value = "pipeline")]
    id: String,

    /// YAML file overriding the default runtime settings (§10.3).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Address the HTTP control plane listens on.
    #[arg(long, default_value = "127.0.0.1:5158")]
    bind: SocketAddr,

    /// Disables the HTTP control plane for this run.
    #[arg(long)]
    no_server: bool,

    /// Bearer token required on control-plane requests, if set.
    #[arg(long)]
    auth_token: Option<String>,
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<PipelineSettings> {
    let Some(path) = path else {
        return Ok(PipelineSettings::default());
    };
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading settings file {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parsing settings file {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_ref())?;

    let operator_registry = tql_df_operators::builtin_registry();
    let operators = tql_df_pipeline::compose(&cli.pipeline, &operator_registry).context("composing pipeline")?;

    let pipeline_id: Cow<'static, str> = Cow::Owned(cli.id.clone());
    info!(pipeline_id = %pipeline_id, operators = operators.len(), "pipeline.build");
    let runtime = RuntimePipeline::new(pipeline_id.clone(), operators, settings);

    let diagnostics = DiagnosticSession::new(cli.id.clone(), 256);
    // Shared with the `metrics` aspect source (§6.4), which polls this same process-wide
    // registry rather than one scoped to this run.
    let buffer_stats = tql_df_operators::buffer_stats_registry();

    let server_handle = if cli.no_server {
        None
    } else {
        let app = router(AppState::new(env!("CARGO_PKG_VERSION"), cli.auth_token.clone()));
        let listener = tokio::net::TcpListener::bind(cli.bind)
            .await
            .with_context(|| format!("binding control plane to {}", cli.bind))?;
        info!(addr = %cli.bind, "control plane listening");
        Some(tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                error!(error = %err, "control plane server exited");
            }
        }))
    };

    let (metrics_sink, _metrics_receiver) = ChannelMetricsSink::new();
    let collector_handle = tokio::spawn(MetricsCollector::new(Arc::clone(&buffer_stats)).run(Arc::new(metrics_sink)));

    let hook_pipeline_id = pipeline_id.to_string();
    let hook_buffer_stats = Arc::clone(&buffer_stats);
    info!(pipeline_id = %pipeline_id, "pipeline.run");
    let result = runtime
        .run_with_edge_hook(diagnostics.clone(), vec![], move |stats| {
            hook_buffer_stats.register(hook_pipeline_id.clone(), stats);
        })
        .await;

    collector_handle.abort();
    if let Some(handle) = server_handle {
        handle.abort();
    }

    result.context("running pipeline")?;
    Ok(())
}
