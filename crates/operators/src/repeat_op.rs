// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! `repeat <n>` (§4.7, §8 property 5: `repeat K` multiplies row count by `K`): buffers the
//! entire input, then replays it `n` times.

use crate::error::Error;
use async_trait::async_trait;
use tql_df_config::ElementType;
use tql_df_engine::{Error as EngineError, Message, Operator, OperatorContext, OperatorErrorKind, OperatorIo, Signature};

/// The `repeat` operator.
pub struct Repeat {
    count: u64,
}

impl Repeat {
    /// Builds a `repeat` operator from its config: a single positional repetition-count
    /// argument, treated as "until cancelled" (`u64::MAX` repetitions internally, §9) when
    /// omitted.
    pub fn build(config: &serde_json::Value) -> Result<Self, Error> {
        let count = config["args"][0].as_u64().unwrap_or(u64::MAX);
        if count == 0 {
            return Err(Error::InvalidArgument {
                operator: "repeat",
                argument: "count",
                message: "repeat count must be at least 1".to_string(),
            });
        }
        Ok(Self { count })
    }
}

#[async_trait(?Send)]
impl Operator for Repeat {
    fn name(&self) -> &'static str {
        "repeat"
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
                message: format!("`repeat` requires record batches, got {input:?}"),
            })
        }
    }

    async fn run(self: Box<Self>, io: OperatorIo, ctx: OperatorContext) -> Result<(), EngineError> {
        let input = io.input.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "repeat has no input edge".to_string(),
        })?;
        let output = io.output.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "repeat has no output edge".to_string(),
        })?;
        let mut buffered = Vec::new();
        loop {
            match input.recv().await? {
                Message::RecordBatch(batch) => buffered.push(batch),
                Message::Exhausted => break,
                other => output.send(other).await?,
            }
        }
        // An omitted count replays until cancelled (§9), so this loop must check the stop
        // signal itself rather than only ever terminating via `self.count`.
        'replay: for _ in 0..self.count {
            if ctx.stop.is_requested() {
                break 'replay;
            }
            for batch in &buffered {
                output.send(Message::RecordBatch(batch.clone())).await?;
            }
        }
        output.send(Message::Exhausted).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_count_to_unbounded() {
        let config = serde_json::json!({"args": [], "kwargs": {}});
        assert_eq!(Repeat::build(&config).unwrap().count, u64::MAX);
    }

    #[test]
    fn rejects_zero_count() {
        let config = serde_json::json!({"args": [0], "kwargs": {}});
        assert!(matches!(Repeat::build(&config), Err(Error::InvalidArgument { .. })));
    }
}
