// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! `metrics` (§6.4, §6.6): the `tenzir.metrics.operator_buffers` aspect source, reading a
//! one-shot snapshot of the process-wide buffer-stats registry through the same
//! [`tql_df_telemetry::MetricsCollector`] that backs the 1 Hz polling hook.

use crate::error::Error;
use async_trait::async_trait;
use std::sync::Arc;
use tql_df_config::ElementType;
use tql_df_engine::{Error as EngineError, Message, Operator, OperatorContext, OperatorErrorKind, OperatorIo, OperatorLocation, Signature};
use tql_df_telemetry::{collector::now_unix_nanos, BufferStatsRegistry, MetricsCollector};

/// The `metrics` aspect source.
pub struct Metrics {
    registry: Arc<BufferStatsRegistry>,
}

impl Metrics {
    /// Builds a `metrics` operator reading from the process-wide buffer-stats registry.
    pub fn build(_config: &serde_json::Value, registry: &Arc<BufferStatsRegistry>) -> Result<Self, Error> {
        Ok(Self {
            registry: Arc::clone(registry),
        })
    }
}

#[async_trait(?Send)]
impl Operator for Metrics {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn signature(&self) -> Signature {
        Signature::SOURCE
    }

    fn location(&self) -> OperatorLocation {
        OperatorLocation::Remote
    }

    fn infer_type(&self, _input: ElementType) -> Result<ElementType, EngineError> {
        Ok(ElementType::RecordBatch)
    }

    async fn run(self: Box<Self>, io: OperatorIo, _ctx: OperatorContext) -> Result<(), EngineError> {
        let output = io.output.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "metrics has no output edge".to_string(),
        })?;
        let collector = MetricsCollector::new(Arc::clone(&self.registry));
        if let Some(batch) = collector
            .poll_once(now_unix_nanos())
            .map_err(|err| EngineError::OperatorError {
                operator: self.name().to_string(),
                kind: OperatorErrorKind::Other,
                message: err.to_string(),
            })?
        {
            output.send(Message::RecordBatch(batch)).await?;
        }
        output.send(Message::Exhausted).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_over_a_shared_registry() {
        let registry = Arc::new(BufferStatsRegistry::new());
        let op = Metrics::build(&serde_json::json!({}), &registry).unwrap();
        assert!(Arc::ptr_eq(&op.registry, &registry));
    }
}
