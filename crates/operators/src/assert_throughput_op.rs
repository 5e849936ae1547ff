// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! `assert_throughput <min_events_per_sec> [within=<duration>]` (§4.7): a passthrough operator
//! that watches its own event rate over a rolling window and raises a diagnostic if it falls
//! below the configured minimum — a warning by default, escalating to an error if the shortfall
//! persists for two consecutive windows.

use crate::error::Error;
use async_trait::async_trait;
use std::time::Duration;
use tql_df_config::ElementType;
use tql_df_diagnostics::Diagnostic;
use tql_df_engine::{Error as EngineError, Message, Operator, OperatorContext, OperatorErrorKind, OperatorIo, Signature};

const DEFAULT_WINDOW: Duration = Duration::from_secs(5);

/// The `assert_throughput` operator.
pub struct AssertThroughput {
    min_events_per_sec: f64,
    window: Duration,
}

impl AssertThroughput {
    /// Builds an `assert_throughput` operator from its config: a positional minimum
    /// events/second threshold, plus an optional `within` keyword duration in seconds.
    pub fn build(config: &serde_json::Value) -> Result<Self, Error> {
        let min_events_per_sec = config["args"][0].as_f64().ok_or(Error::MissingArgument {
            operator: "assert_throughput",
            argument: "min_events_per_sec",
        })?;
        let window = config["kwargs"]["within"]
            .as_f64()
            .map_or(DEFAULT_WINDOW, Duration::from_secs_f64);
        Ok(Self {
            min_events_per_sec,
            window,
        })
    }
}

#[async_trait(?Send)]
impl Operator for AssertThroughput {
    fn name(&self) -> &'static str {
        "assert_throughput"
    }

    fn signature(&self) -> Signature {
        Signature::TRANSFORMATION
    }

    fn infer_type(&self, input: ElementType) -> Result<ElementType, EngineError> {
        Ok(input)
    }

    async fn run(self: Box<Self>, io: OperatorIo, ctx: OperatorContext) -> Result<(), EngineError> {
        let input = io.input.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "assert_throughput has no input edge".to_string(),
        })?;
        let output = io.output.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "assert_throughput has no output edge".to_string(),
        })?;

        let mut window_start = tokio::time::Instant::now();
        let mut window_events: u64 = 0;
        let mut consecutive_shortfalls = 0u32;

        loop {
            let message = input.recv().await?;
            let is_exhausted = message.is_exhausted();
            window_events += message.approx_events();

            let elapsed = window_start.elapsed();
            if elapsed >= self.window || is_exhausted {
                let rate = window_events as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
                if rate < self.min_events_per_sec {
                    consecutive_shortfalls += 1;
                    let message = format!(
                        "throughput {rate:.2} events/sec fell below minimum {:.2}",
                        self.min_events_per_sec
                    );
                    let builder = if consecutive_shortfalls >= 2 {
                        Diagnostic::error(message)
                    } else {
                        Diagnostic::warning(message)
                    };
                    let _ = builder.emit(&ctx.diagnostics);
                } else {
                    consecutive_shortfalls = 0;
                }
                window_start = tokio::time::Instant::now();
                window_events = 0;
            }

            output.send(message).await?;
            if is_exhausted {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimum_rate_and_window() {
        let config = serde_json::json!({"args": [100], "kwargs": {"within": 10}});
        let op = AssertThroughput::build(&config).unwrap();
        assert!((op.min_events_per_sec - 100.0).abs() < f64::EPSILON);
        assert_eq!(op.window, Duration::from_secs(10));
    }

    #[test]
    fn defaults_window_when_omitted() {
        let config = serde_json::json!({"args": [1], "kwargs": {}});
        assert_eq!(AssertThroughput::build(&config).unwrap().window, DEFAULT_WINDOW);
    }
}
