// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! `plugins` (§6.4): the aspect source over registered builtins (`name, version, kind, types[],
//! dependencies[]`). There is no dynamic plugin loader in this crate (§9: builtins are a static
//! list, not dynamic constructors), so this enumerates the process's static operator, function,
//! and aggregation registries instead of an on-disk plugin manifest.

use crate::error::Error;
use async_trait::async_trait;
use std::sync::Arc;
use tql_df_config::ElementType;
use tql_df_engine::{Error as EngineError, Message, Operator, OperatorContext, OperatorErrorKind, OperatorIo, OperatorLocation, Signature};
use tql_df_expr::{AggregationRegistry, FunctionRegistry};
use tql_df_pipeline::OperatorRegistry;
use tql_df_value::{batches_from_rows, Value, DEFAULT_BATCH_ROW_CAP};

/// The crate's own version, reported for every builtin row.
const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

fn plugin_row(name: &str, kind: &str) -> Value {
    Value::Record(vec![
        ("name".to_string(), Value::from(name)),
        ("version".to_string(), Value::from(CRATE_VERSION)),
        ("kind".to_string(), Value::from(kind)),
        ("types".to_string(), Value::from(kind)),
        ("dependencies".to_string(), Value::Null),
    ])
}

/// The `plugins` aspect source.
pub struct Plugins {
    operators: Arc<OperatorRegistry>,
}

impl Plugins {
    /// Builds a `plugins` operator enumerating `registry`'s registered operator names, plus the
    /// builtin function and aggregation registries.
    pub fn build(_config: &serde_json::Value, registry: &Arc<OperatorRegistry>) -> Result<Self, Error> {
        Ok(Self {
            operators: Arc::clone(registry),
        })
    }
}

#[async_trait(?Send)]
impl Operator for Plugins {
    fn name(&self) -> &'static str {
        "plugins"
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
            message: "plugins has no output edge".to_string(),
        })?;
        let mut rows = Vec::new();
        let mut operator_names = self.operators.names();
        operator_names.sort_unstable();
        for name in operator_names {
            rows.push(plugin_row(name, "operator"));
        }
        let mut function_names = FunctionRegistry::with_builtins().names();
        function_names.sort_unstable();
        for name in function_names {
            rows.push(plugin_row(name, "function"));
        }
        let mut aggregation_names = AggregationRegistry::with_builtins().names();
        aggregation_names.sort_unstable();
        for name in aggregation_names {
            rows.push(plugin_row(name, "aggregation"));
        }
        let batches = batches_from_rows(&rows, "plugins".to_string(), DEFAULT_BATCH_ROW_CAP)?;
        for batch in batches {
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
    fn builds_over_a_shared_operator_registry() {
        let registry = Arc::new(OperatorRegistry::new());
        let op = Plugins::build(&serde_json::json!({}), &registry).unwrap();
        assert!(Arc::ptr_eq(&op.operators, &registry));
    }
}
