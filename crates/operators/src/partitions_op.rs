// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! `partitions` (§6.4): the aspect source over persisted partition metadata
//! (`uuid, memusage, events, min_import_time, max_import_time, version, schema, schema_id,
//! internal`). This pipeline engine has no durable storage layer of its own (§1: no durability
//! guarantees for in-flight events beyond checkpoint boundaries), so this aspect source always
//! yields zero rows; the schema shape is preserved so a collector querying it sees the correct
//! columns rather than an error.

use crate::error::Error;
use async_trait::async_trait;
use tql_df_config::ElementType;
use tql_df_engine::{Error as EngineError, Message, Operator, OperatorContext, OperatorErrorKind, OperatorIo, OperatorLocation, Signature};
use tql_df_value::{Field, RecordBatch, Schema, Type};

const SCHEMA_NAME: &str = "tenzir.catalog.partitions";

fn partitions_schema() -> Result<Schema, tql_df_value::ValueError> {
    Schema::from_record_type(
        Type::record(vec![
            Field::new("uuid", Type::string()),
            Field::new("memusage", Type::uint64()),
            Field::new("events", Type::uint64()),
            Field::new("min_import_time", Type::time()),
            Field::new("max_import_time", Type::time()),
            Field::new("version", Type::uint64()),
            Field::new("schema", Type::string()),
            Field::new("schema_id", Type::uint64()),
            Field::new("internal", Type::bool()),
        ])
        .named(SCHEMA_NAME),
    )
}

/// The `partitions` aspect source.
pub struct Partitions;

impl Partitions {
    /// Builds a `partitions` operator; this aspect source takes no arguments.
    pub fn build(_config: &serde_json::Value) -> Result<Self, Error> {
        Ok(Self)
    }
}

#[async_trait(?Send)]
impl Operator for Partitions {
    fn name(&self) -> &'static str {
        "partitions"
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
            message: "partitions has no output edge".to_string(),
        })?;
        let schema = partitions_schema()?;
        output.send(Message::RecordBatch(RecordBatch::empty(schema))).await?;
        output.send(Message::Exhausted).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_has_every_catalog_column() {
        let schema = partitions_schema().unwrap();
        assert_eq!(schema.fields().len(), 9);
        assert_eq!(schema.name(), Some(SCHEMA_NAME));
    }
}
