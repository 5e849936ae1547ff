// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! `head <n>` and `tail <n>` (§4.7, §8 property 4: `head N | tail N` and `tail N | head N`
//! exactness on inputs with at least `N` rows).

use crate::error::Error;
use async_trait::async_trait;
use tql_df_config::ElementType;
use tql_df_engine::{Error as EngineError, Message, Operator, OperatorContext, OperatorErrorKind, OperatorIo, Signature};

fn parse_count(config: &serde_json::Value, operator: &'static str) -> Result<usize, Error> {
    let count = config["args"][0].as_u64().ok_or(Error::MissingArgument {
        operator,
        argument: "count",
    })?;
    Ok(count as usize)
}

fn require_record_batch(name: &'static str, input: ElementType) -> Result<ElementType, EngineError> {
    if input == ElementType::RecordBatch {
        Ok(ElementType::RecordBatch)
    } else {
        Err(EngineError::TypeClash {
            operator: name.to_string(),
            message: format!("`{name}` requires record batches, got {input:?}"),
        })
    }
}

/// The `head` operator: emits at most the first `n` rows, then stops pulling upstream.
pub struct Head {
    count: usize,
}

impl Head {
    /// Builds a `head` operator from its config: a single positional row-count argument.
    pub fn build(config: &serde_json::Value) -> Result<Self, Error> {
        Ok(Self {
            count: parse_count(config, "head")?,
        })
    }
}

#[async_trait(?Send)]
impl Operator for Head {
    fn name(&self) -> &'static str {
        "head"
    }

    fn signature(&self) -> Signature {
        Signature::TRANSFORMATION
    }

    fn infer_type(&self, input: ElementType) -> Result<ElementType, EngineError> {
        require_record_batch(self.name(), input)
    }

    async fn run(self: Box<Self>, io: OperatorIo, ctx: OperatorContext) -> Result<(), EngineError> {
        let input = io.input.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "head has no input edge".to_string(),
        })?;
        let output = io.output.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "head has no output edge".to_string(),
        })?;
        let mut remaining = self.count;
        loop {
            if remaining == 0 {
                // Nothing more is ever needed from upstream (§4.5 Cancellation): ask the whole
                // pipeline to stop rather than leaving a producer to run unbounded.
                ctx.stop.request();
                output.send(Message::Exhausted).await?;
                return Ok(());
            }
            match input.recv().await? {
                Message::RecordBatch(batch) => {
                    let take = remaining.min(batch.rows());
                    remaining -= take;
                    if take > 0 {
                        output.send(Message::RecordBatch(batch.slice(0, take))).await?;
                    }
                }
                Message::Exhausted => {
                    output.send(Message::Exhausted).await?;
                    return Ok(());
                }
                other => output.send(other).await?,
            }
        }
    }
}

/// The `tail` operator: buffers rows and emits only the final `n` once the input is exhausted.
pub struct Tail {
    count: usize,
}

impl Tail {
    /// Builds a `tail` operator from its config: a single positional row-count argument.
    pub fn build(config: &serde_json::Value) -> Result<Self, Error> {
        Ok(Self {
            count: parse_count(config, "tail")?,
        })
    }
}

#[async_trait(?Send)]
impl Operator for Tail {
    fn name(&self) -> &'static str {
        "tail"
    }

    fn signature(&self) -> Signature {
        Signature::TRANSFORMATION
    }

    fn infer_type(&self, input: ElementType) -> Result<ElementType, EngineError> {
        require_record_batch(self.name(), input)
    }

    async fn run(self: Box<Self>, io: OperatorIo, _ctx: OperatorContext) -> Result<(), EngineError> {
        let input = io.input.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "tail has no input edge".to_string(),
        })?;
        let output = io.output.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "tail has no output edge".to_string(),
        })?;
        let mut buffered = Vec::new();
        let mut buffered_rows = 0usize;
        loop {
            match input.recv().await? {
                Message::RecordBatch(batch) => {
                    buffered_rows += batch.rows();
                    buffered.push(batch);
                    while buffered.len() > 1 && buffered_rows - buffered[0].rows() >= self.count {
                        buffered_rows -= buffered[0].rows();
                        buffered.remove(0);
                    }
                }
                Message::Exhausted => {
                    let skip = buffered_rows.saturating_sub(self.count);
                    let mut to_skip = skip;
                    for batch in &buffered {
                        if to_skip >= batch.rows() {
                            to_skip -= batch.rows();
                            continue;
                        }
                        let tail = batch.slice(to_skip, batch.rows() - to_skip);
                        to_skip = 0;
                        output.send(Message::RecordBatch(tail)).await?;
                    }
                    output.send(Message::Exhausted).await?;
                    return Ok(());
                }
                other => output.send(other).await?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_row_count() {
        let config = serde_json::json!({"args": [3], "kwargs": {}});
        assert_eq!(Head::build(&config).unwrap().count, 3);
        assert_eq!(Tail::build(&config).unwrap().count, 3);
    }

    #[test]
    fn rejects_missing_count() {
        let config = serde_json::json!({"args": [], "kwargs": {}});
        assert!(matches!(Head::build(&config), Err(Error::MissingArgument { .. })));
    }
}
