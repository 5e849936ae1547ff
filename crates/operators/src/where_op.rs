// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! `where <expr>` (§4.7): keeps only the rows for which a boolean expression evaluates true.

use crate::error::Error;
use async_trait::async_trait;
use tql_df_config::ElementType;
use tql_df_engine::{Error as EngineError, Message, Operator, OperatorContext, OperatorErrorKind, OperatorIo, Signature};
use tql_df_expr::{eval, Expr};
use tql_df_value::{batches_from_rows, RecordBatch, Value, DEFAULT_BATCH_ROW_CAP};

/// The `where` filtering operator.
pub struct Where {
    predicate: Expr,
}

impl Where {
    /// Builds a `where` operator from its config: a single positional argument holding the raw
    /// TQL expression text.
    pub fn build(config: &serde_json::Value) -> Result<Self, Error> {
        let text = config["args"][0].as_str().ok_or(Error::MissingArgument {
            operator: "where",
            argument: "predicate",
        })?;
        let predicate = tql_df_pipeline::parse_expr(text)?;
        Ok(Self { predicate })
    }

    fn filter_batch(&self, batch: &RecordBatch, ctx: &OperatorContext) -> Result<RecordBatch, EngineError> {
        let rows = batch.to_rows()?;
        let series = eval(&self.predicate, &rows, &ctx.functions, Some(&ctx.diagnostics));
        let kept: Vec<Value> = rows
            .into_iter()
            .zip(series.values)
            .filter_map(|(row, keep)| matches!(keep, Value::Bool(true)).then_some(row))
            .collect();
        if kept.is_empty() {
            return Ok(RecordBatch::empty(batch.schema().clone()));
        }
        let schema_name = batch.schema().name().map(str::to_string);
        let batches = batches_from_rows(&kept, schema_name, DEFAULT_BATCH_ROW_CAP)?;
        batches.into_iter().next().map_or_else(|| Ok(RecordBatch::empty(batch.schema().clone())), Ok)
    }
}

#[async_trait(?Send)]
impl Operator for Where {
    fn name(&self) -> &'static str {
        "where"
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
                message: format!("`where` requires record batches, got {input:?}"),
            })
        }
    }

    async fn run(self: Box<Self>, io: OperatorIo, ctx: OperatorContext) -> Result<(), EngineError> {
        let input = io.input.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "where has no input edge".to_string(),
        })?;
        let output = io.output.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "where has no output edge".to_string(),
        })?;
        loop {
            match input.recv().await? {
                Message::RecordBatch(batch) => {
                    let filtered = self.filter_batch(&batch, &ctx)?;
                    output.send(Message::RecordBatch(filtered)).await?;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_predicate_from_config() {
        let config = serde_json::json!({"args": ["a > 1"], "kwargs": {}});
        assert!(Where::build(&config).is_ok());
    }

    #[test]
    fn rejects_missing_argument() {
        let config = serde_json::json!({"args": [], "kwargs": {}});
        assert!(matches!(Where::build(&config), Err(Error::MissingArgument { .. })));
    }
}
