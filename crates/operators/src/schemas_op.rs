// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! `schemas` (§6.4): the aspect source exposing distinct type definitions seen so far in this
//! process, via [`crate::schema_catalog`]. Cross-node schema registry synchronization is an
//! explicit non-goal (§1), so this catalog is local to the process.

use crate::error::Error;
use crate::schema_catalog::schema_catalog;
use async_trait::async_trait;
use tql_df_config::ElementType;
use tql_df_engine::{Error as EngineError, Message, Operator, OperatorContext, OperatorErrorKind, OperatorIo, OperatorLocation, Signature};
use tql_df_value::{batches_from_rows, Schema, Value, DEFAULT_BATCH_ROW_CAP};

/// The `schemas` aspect source.
pub struct Schemas;

impl Schemas {
    /// Builds a `schemas` operator; this aspect source takes no arguments.
    pub fn build(_config: &serde_json::Value) -> Result<Self, Error> {
        Ok(Self)
    }
}

fn schema_row(schema: &Schema) -> Value {
    let fields = schema
        .fields()
        .iter()
        .map(|field| format!("{}:{:?}", field.name, field.ty.kind))
        .collect::<Vec<_>>()
        .join(", ");
    Value::Record(vec![
        (
            "name".to_string(),
            schema.name().map_or(Value::Null, Value::from),
        ),
        ("fingerprint".to_string(), Value::Uint64(schema.fingerprint())),
        ("fields".to_string(), Value::from(fields.as_str())),
    ])
}

#[async_trait(?Send)]
impl Operator for Schemas {
    fn name(&self) -> &'static str {
        "schemas"
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
            message: "schemas has no output edge".to_string(),
        })?;
        let rows: Vec<Value> = schema_catalog().snapshot().iter().map(schema_row).collect();
        if !rows.is_empty() {
            let batches = batches_from_rows(&rows, "schemas".to_string(), DEFAULT_BATCH_ROW_CAP)?;
            for batch in batches {
                output.send(Message::RecordBatch(batch)).await?;
            }
        }
        output.send(Message::Exhausted).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tql_df_value::{Field, Type};

    #[test]
    fn renders_field_list() {
        let schema = Schema::from_record_type(Type::record(vec![Field::new("a", Type::int64())])).unwrap();
        let Value::Record(fields) = schema_row(&schema) else { panic!("expected a record") };
        assert!(fields.contains(&("fields".to_string(), Value::from("a:Int64"))));
    }
}
