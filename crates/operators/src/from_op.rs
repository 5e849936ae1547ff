// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! `from <events>` (§4.7): a literal source used for tests and ad-hoc pipelines, emitting a
//! provided JSON array of records as one or more batches.

use crate::error::Error;
use crate::json::from_json;
use async_trait::async_trait;
use tql_df_config::ElementType;
use tql_df_engine::{Error as EngineError, Message, Operator, OperatorContext, OperatorErrorKind, OperatorIo, Signature};
use tql_df_value::{batches_from_rows, DEFAULT_BATCH_ROW_CAP};

/// The `from` source operator.
pub struct From {
    rows: Vec<tql_df_value::Value>,
}

impl From {
    /// Builds a `from` operator from its config: a single positional argument holding the raw
    /// JSON-array source text, as captured by the grammar's catch-all expression literal.
    pub fn build(config: &serde_json::Value) -> Result<Self, Error> {
        let text = config["args"][0].as_str().ok_or(Error::MissingArgument {
            operator: "from",
            argument: "events",
        })?;
        let json: serde_json::Value = serde_json::from_str(text).map_err(|err| Error::InvalidArgument {
            operator: "from",
            argument: "events",
            message: err.to_string(),
        })?;
        let serde_json::Value::Array(items) = json else {
            return Err(Error::InvalidArgument {
                operator: "from",
                argument: "events",
                message: "expected a JSON array of records".to_string(),
            });
        };
        Ok(Self {
            rows: items.iter().map(from_json).collect(),
        })
    }
}

#[async_trait(?Send)]
impl Operator for From {
    fn name(&self) -> &'static str {
        "from"
    }

    fn signature(&self) -> Signature {
        Signature::SOURCE
    }

    fn infer_type(&self, _input: ElementType) -> Result<ElementType, EngineError> {
        Ok(ElementType::RecordBatch)
    }

    async fn run(self: Box<Self>, io: OperatorIo, _ctx: OperatorContext) -> Result<(), EngineError> {
        let output = io.output.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "from has no output edge".to_string(),
        })?;
        let batches = batches_from_rows(&self.rows, "from".to_string(), DEFAULT_BATCH_ROW_CAP)?;
        for batch in batches {
            crate::schema_catalog::schema_catalog().register(batch.schema());
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
    fn parses_json_array_of_records() {
        let config = serde_json::json!({"args": [r#"[{"a": 1}, {"a": 2}]"#], "kwargs": {}});
        let op = From::build(&config).unwrap();
        assert_eq!(op.rows.len(), 2);
    }

    #[test]
    fn rejects_missing_argument() {
        let config = serde_json::json!({"args": [], "kwargs": {}});
        assert!(matches!(From::build(&config), Err(Error::MissingArgument { .. })));
    }
}
