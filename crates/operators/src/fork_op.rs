// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! `fork <pipe>` (§4.7): duplicates the record batch stream into an independent side chain,
//! forwarding the original stream unmodified to this operator's own output. A failure in the
//! side chain is reported as a diagnostic and does not fail the main pipeline, matching how
//! `tracing` is used elsewhere in this crate to surface non-fatal operator trouble.

use crate::error::Error;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tql_df_config::settings::{DEFAULT_CHANNEL_BUFFER_SIZE, DEFAULT_WATERMARK_RATIO};
use tql_df_config::ElementType;
use tql_df_diagnostics::Diagnostic;
use tql_df_engine::{
    stage_edge, Error as EngineError, Message, Operator, OperatorContext, OperatorErrorKind, OperatorIo, Signature,
    StageReceiver, StageSender,
};
use tql_df_pipeline::OperatorRegistry;

/// How long the side pipeline is given to drain after the main stream is exhausted before it is
/// force-dropped rather than awaited to completion: the side chain is a best-effort sink, never
/// something the main pipeline's shutdown should block on indefinitely.
const SIDE_DRAIN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// The `fork` operator.
pub struct Fork {
    side: Vec<Box<dyn Operator>>,
}

impl Fork {
    /// Builds a `fork` operator from its config: a single positional argument holding the raw
    /// TQL text of the side pipeline. The side pipeline is type-checked as if fed record
    /// batches directly (it has no source stage of its own) against `registry`.
    pub fn build(config: &serde_json::Value, registry: &Arc<OperatorRegistry>) -> Result<Self, Error> {
        let text = config["args"][0].as_str().ok_or(Error::MissingArgument {
            operator: "fork",
            argument: "pipe",
        })?;
        let side = tql_df_pipeline::compose_from(text, registry, ElementType::RecordBatch)?;
        Ok(Self { side })
    }
}

#[async_trait(?Send)]
impl Operator for Fork {
    fn name(&self) -> &'static str {
        "fork"
    }

    fn signature(&self) -> Signature {
        Signature::TRANSFORMATION
    }

    fn infer_type(&self, input: ElementType) -> Result<ElementType, EngineError> {
        if input == ElementType::RecordBatch {
            Ok(ElementType::RecordBatch)
        } else {
            Err(EngineError::TypeClash {
                operator: self.name().to_string(),
                message: format!("`fork` requires record batches, got {input:?}"),
            })
        }
    }

    async fn run(self: Box<Self>, io: OperatorIo, ctx: OperatorContext) -> Result<(), EngineError> {
        let input = io.input.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "fork has no input edge".to_string(),
        })?;
        let output = io.output.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "fork has no output edge".to_string(),
        })?;

        let stage_count = self.side.len();
        let mut edges: Vec<Option<(StageSender, StageReceiver)>> = (0..stage_count.saturating_sub(1))
            .map(|_| Some(stage_edge(DEFAULT_CHANNEL_BUFFER_SIZE, DEFAULT_WATERMARK_RATIO)))
            .collect();
        let (feeder_tx, feeder_rx) = stage_edge(DEFAULT_CHANNEL_BUFFER_SIZE, DEFAULT_WATERMARK_RATIO);

        let mut side_tasks = Vec::with_capacity(stage_count);
        for (index, operator) in self.side.into_iter().enumerate() {
            let stage_input = if index == 0 { Some(feeder_rx) } else { edges[index - 1].take().map(|(_, rx)| rx) };
            let stage_output = if index + 1 == stage_count { None } else { edges[index].take().map(|(tx, _)| tx) };
            let stage_ctx = OperatorContext {
                diagnostics: ctx.diagnostics.clone(),
                functions: ctx.functions.clone(),
                restored_state: None,
                stop: ctx.stop.clone(),
            };
            let stage_io = OperatorIo {
                input: stage_input,
                output: stage_output,
            };
            side_tasks.push(tokio::task::spawn_local(async move { operator.run(stage_io, stage_ctx).await }));
        }

        loop {
            match input.recv().await? {
                Message::RecordBatch(batch) => {
                    let _ = feeder_tx.send(Message::RecordBatch(batch.clone())).await;
                    output.send(Message::RecordBatch(batch)).await?;
                }
                Message::Exhausted => {
                    let _ = feeder_tx.send(Message::Exhausted).await;
                    output.send(Message::Exhausted).await?;
                    break;
                }
                other => output.send(other).await?,
            }
        }

        for task in side_tasks {
            let abort_handle = task.abort_handle();
            match tokio::time::timeout(SIDE_DRAIN_GRACE_PERIOD, task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(err))) => {
                    let _ = Diagnostic::warning(format!("fork side pipeline failed: {err}")).emit(&ctx.diagnostics);
                }
                Ok(Err(err)) => {
                    let _ = Diagnostic::warning(format!("fork side pipeline task panicked: {err}")).emit(&ctx.diagnostics);
                }
                Err(_) => {
                    abort_handle.abort();
                    let _ = Diagnostic::warning(format!(
                        "fork side pipeline did not drain within {}s, dropping it",
                        SIDE_DRAIN_GRACE_PERIOD.as_secs()
                    ))
                    .emit(&ctx.diagnostics);
                }
            }
        }
        Ok(())
    }
}
