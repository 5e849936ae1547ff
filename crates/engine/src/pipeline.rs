// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The runtime pipeline (§4.5): a linear chain of operator instances, wired together with
//! bounded single-threaded edges and driven on a `tokio` `LocalSet` so `!Send` operator state
//! is fine; different pipelines still run concurrently on the shared multi-threaded runtime.

use crate::checkpoint::StateBlob;
use crate::edge::{stage_edge, BufferSnapshot, BufferStats, StageReceiver, StageSender};
use crate::error::Error;
use crate::operator::{Operator, OperatorContext, OperatorIo};
use crate::stop::StopSignal;
use std::sync::Arc;
use tql_df_config::{PipelineId, PipelineSettings};
use tql_df_diagnostics::{Diagnostic, DiagnosticSession};
use tql_df_expr::FunctionRegistry;

/// A linear, instantiated pipeline ready to run (§3.5: an ordered, non-empty sequence of
/// operators).
pub struct RuntimePipeline {
    pipeline_id: PipelineId,
    operators: Vec<Box<dyn Operator>>,
    settings: PipelineSettings,
}

impl RuntimePipeline {
    /// Builds a runtime pipeline from an already-composed, type-checked operator chain.
    /// Composition (flatten/type-check/optimize/locate, §4.4) happens upstream of this type.
    #[must_use]
    pub fn new(pipeline_id: PipelineId, operators: Vec<Box<dyn Operator>>, settings: PipelineSettings) -> Self {
        Self {
            pipeline_id,
            operators,
            settings,
        }
    }

    /// The number of operators in this pipeline.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    /// Whether this pipeline has no operators. A well-formed pipeline never does (§3.5), but
    /// this is cheap to check before `run` so callers get `Error::EmptyPipeline` instead of an
    /// empty-range panic.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Runs every operator to completion, returning once the sink observes `exhausted` or any
    /// operator fails. Restored state blobs (§4.6 Recovery), if any, are supplied one per
    /// operator in pipeline order; pass an empty slice when starting cold.
    pub async fn run(self, diagnostics: DiagnosticSession, restored_state: Vec<Option<StateBlob>>) -> Result<(), Error> {
        self.run_with_edge_hook(diagnostics, restored_state, |_| {}).await
    }

    /// Like [`Self::run`], but calls `on_edge` once per internal edge as it is created, with
    /// that edge's shared [`BufferStats`] cell. The metrics hook (§4.8) registers each cell
    /// with the process-wide [`BufferStatsRegistry`](https://docs.rs/tql-df-telemetry) this
    /// way, since that registry lives in a crate downstream of this one.
    pub async fn run_with_edge_hook<F>(self, diagnostics: DiagnosticSession, restored_state: Vec<Option<StateBlob>>, on_edge: F) -> Result<(), Error>
    where
        F: Fn(&Arc<BufferStats>),
    {
        if self.operators.is_empty() {
            return Err(Error::EmptyPipeline);
        }
        let local = tokio::task::LocalSet::new();
        local.run_until(self.run_on_local_set(diagnostics, restored_state, on_edge)).await
    }

    async fn run_on_local_set<F>(self, diagnostics: DiagnosticSession, mut restored_state: Vec<Option<StateBlob>>, on_edge: F) -> Result<(), Error>
    where
        F: Fn(&Arc<BufferStats>),
    {
        let operator_count = self.operators.len();
        let mut edges: Vec<Option<(StageSender, StageReceiver)>> = (0..operator_count.saturating_sub(1))
            .map(|_| {
                let (tx, rx) = stage_edge(self.settings.channel_buffer_size, self.settings.watermark_ratio);
                on_edge(&tx.stats());
                Some((tx, rx))
            })
            .collect();

        let functions = FunctionRegistry::with_builtins();
        let stop = StopSignal::new();

        // An external interrupt is honored the same way any operator's own stop request is:
        // cooperatively, at the next yield point, never by killing tasks outright.
        let ctrl_c_stop = stop.clone();
        let _ctrl_c_listener = tokio::task::spawn_local(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c_stop.request();
            }
        });

        // Composition guarantees every consumer reaches its open phase before its producer is
        // polled for the first time (§4.5): each operator performs its own open phase at the
        // top of `run`, before touching `io.input`, so spawning all stages up front and letting
        // the scheduler interleave them satisfies that ordering without an explicit barrier.
        let mut tasks = Vec::with_capacity(operator_count);
        for (index, operator) in self.operators.into_iter().enumerate() {
            let input = if index == 0 {
                None
            } else {
                edges[index - 1].take().map(|(_, rx)| rx)
            };
            let output = if index + 1 == operator_count {
                None
            } else {
                edges[index].take().map(|(tx, _)| tx)
            };
            let idle_after = operator.idle_after();
            let input_stats = input.as_ref().map(StageReceiver::stats);
            let output_stats = output.as_ref().map(StageSender::stats);
            let ctx = OperatorContext {
                diagnostics: diagnostics.clone(),
                functions: functions.clone(),
                restored_state: restored_state.get_mut(index).and_then(Option::take),
                stop: stop.clone(),
            };
            let name = operator.name();
            let io = OperatorIo { input, output };
            let task = tokio::task::spawn_local(async move { operator.run(io, ctx).await });
            let watchdog = tokio::task::spawn_local(stall_watchdog(name, idle_after, input_stats, output_stats, diagnostics.clone()));
            tasks.push((name, task, watchdog));
        }

        for (name, task, watchdog) in tasks {
            let join_result = task.await;
            watchdog.abort();
            join_result
                .map_err(|join_err| Error::JoinTaskError {
                    is_cancelled: join_err.is_cancelled(),
                    is_panic: join_err.is_panic(),
                    message: format!("operator `{name}` join error: {join_err}"),
                })??;
        }
        Ok(())
    }

    /// The pipeline id this runtime instance was built for.
    #[must_use]
    pub fn pipeline_id(&self) -> &PipelineId {
        &self.pipeline_id
    }
}

/// Watches one operator's edges for activity; if neither its input nor output buffer stats
/// change across a full `idle_after` window, emits a stall diagnostic (§4.5). An operator with
/// neither edge (the sole stage of a one-operator pipeline) is never watched, since there is
/// nothing whose silence would indicate a stall. Aborted by the caller once the operator's own
/// task completes.
async fn stall_watchdog(
    name: &'static str,
    idle_after: std::time::Duration,
    input_stats: Option<Arc<BufferStats>>,
    output_stats: Option<Arc<BufferStats>>,
    diagnostics: DiagnosticSession,
) {
    if input_stats.is_none() && output_stats.is_none() {
        return;
    }
    let snapshot = || (input_stats.as_ref().map(|s| s.snapshot()), output_stats.as_ref().map(|s| s.snapshot()));
    let mut last = snapshot();
    loop {
        tokio::time::sleep(idle_after).await;
        let current = snapshot();
        if current == last {
            let stall = Error::StallTimeout {
                operator: name.to_string(),
                elapsed_secs: idle_after.as_secs(),
                limit_secs: idle_after.as_secs(),
            };
            Diagnostic::warning(stall.to_string())
                .note(format!("no messages crossed `{name}`'s edges in at least {}s", idle_after.as_secs()))
                .emit(&diagnostics);
        }
        last = current;
    }
}

/// A point-in-time read of every edge's buffer stats, keyed by the index of the edge (between
/// operator `i` and `i + 1`). Used by the metrics hook (§4.8) when polling a running pipeline
/// directly rather than through the process-wide registry.
#[must_use]
pub fn snapshot_edges(senders: &[StageSender]) -> Vec<BufferSnapshot> {
    senders.iter().map(|s| s.stats().snapshot()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OperatorErrorKind;
    use crate::message::Message;
    use crate::operator::{EventOrder, OperatorLocation, OptimizeOutcome, Signature};
    use async_trait::async_trait;
    use tql_df_value::{RecordBatch, Schema, Type};

    struct CountingSource {
        remaining: u32,
    }

    #[async_trait(?Send)]
    impl Operator for CountingSource {
        fn name(&self) -> &'static str {
            "test_source"
        }
        fn signature(&self) -> Signature {
            Signature::SOURCE
        }
        fn infer_type(&self, _input: tql_df_config::ElementType) -> Result<tql_df_config::ElementType, Error> {
            Ok(tql_df_config::ElementType::RecordBatch)
        }
        async fn run(mut self: Box<Self>, io: OperatorIo, _ctx: OperatorContext) -> Result<(), Error> {
            let output = io.output.ok_or_else(|| Error::OperatorError {
                operator: self.name().to_string(),
                kind: OperatorErrorKind::Open,
                message: "source has no output edge".to_string(),
            })?;
            let schema = Schema::from_record_type(Type::record(vec![]).named("empty")).map_err(Error::ValueError)?;
            while self.remaining > 0 {
                self.remaining -= 1;
                output.send(Message::RecordBatch(RecordBatch::empty(schema.clone()))).await?;
            }
            output.send(Message::Exhausted).await?;
            Ok(())
        }
    }

    struct CountingSink {
        seen: std::rc::Rc<std::cell::Cell<u32>>,
    }

    #[async_trait(?Send)]
    impl Operator for CountingSink {
        fn name(&self) -> &'static str {
            "test_sink"
        }
        fn signature(&self) -> Signature {
            Signature::SINK
        }
        fn infer_type(&self, input: tql_df_config::ElementType) -> Result<tql_df_config::ElementType, Error> {
            Ok(input)
        }
        async fn run(self: Box<Self>, io: OperatorIo, _ctx: OperatorContext) -> Result<(), Error> {
            let input = io.input.ok_or_else(|| Error::OperatorError {
                operator: self.name().to_string(),
                kind: OperatorErrorKind::Open,
                message: "sink has no input edge".to_string(),
            })?;
            loop {
                match input.recv().await? {
                    Message::Exhausted => break,
                    Message::RecordBatch(_) => {
                        self.seen.set(self.seen.get() + 1);
                    }
                    _ => {}
                }
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn runs_source_through_sink() {
        let seen = std::rc::Rc::new(std::cell::Cell::new(0));
        let pipeline = RuntimePipeline::new(
            std::borrow::Cow::Borrowed("p"),
            vec![
                Box::new(CountingSource { remaining: 3 }),
                Box::new(CountingSink { seen: seen.clone() }),
            ],
            PipelineSettings::default(),
        );
        let diagnostics = DiagnosticSession::new("p", 16);
        pipeline.run(diagnostics, vec![None, None]).await.unwrap();
        assert_eq!(seen.get(), 3);
    }

    #[tokio::test]
    async fn empty_pipeline_is_rejected() {
        let pipeline = RuntimePipeline::new(std::borrow::Cow::Borrowed("p"), vec![], PipelineSettings::default());
        let diagnostics = DiagnosticSession::new("p", 16);
        let err = pipeline.run(diagnostics, vec![]).await.unwrap_err();
        assert!(matches!(err, Error::EmptyPipeline));
    }

    #[test]
    fn signature_and_location_defaults_are_sane() {
        assert!(Signature::SOURCE.contains(Signature::SOURCE));
        assert_eq!(OperatorLocation::default(), OperatorLocation::Anywhere);
        assert_eq!(EventOrder::default(), EventOrder::Ordered);
        assert!(matches!(
            CountingSink {
                seen: std::rc::Rc::new(std::cell::Cell::new(0))
            }
            .optimize(None, EventOrder::Ordered),
            OptimizeOutcome::DoNotOptimize
        ));
    }
}
