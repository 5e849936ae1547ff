// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! `unordered` (§4.7, §8 property 6: multiset preservation under reordering): a passthrough
//! that relaxes the row-order contract requested of its upstream, letting the optimizer (§4.4)
//! hand any pending filter straight through while requesting `EventOrder::Unordered`.

use crate::error::Error;
use async_trait::async_trait;
use tql_df_config::ElementType;
use tql_df_engine::{
    Error as EngineError, EventOrder, Message, Operator, OperatorContext, OperatorErrorKind, OperatorIo,
    OptimizeOutcome, Signature,
};
use tql_df_expr::Expr;

/// The `unordered` operator.
pub struct Unordered;

impl Unordered {
    /// Builds an `unordered` operator; it takes no arguments.
    pub fn build(_config: &serde_json::Value) -> Result<Self, Error> {
        Ok(Self)
    }
}

#[async_trait(?Send)]
impl Operator for Unordered {
    fn name(&self) -> &'static str {
        "unordered"
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
                message: format!("`unordered` requires record batches, got {input:?}"),
            })
        }
    }

    fn optimize(&self, filter: Option<Expr>, _order: EventOrder) -> OptimizeOutcome {
        OptimizeOutcome::Pushed {
            residual_filter: filter,
            requested_order: EventOrder::Unordered,
            replacement: Box::new(Self),
        }
    }

    async fn run(self: Box<Self>, io: OperatorIo, _ctx: OperatorContext) -> Result<(), EngineError> {
        let input = io.input.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "unordered has no input edge".to_string(),
        })?;
        let output = io.output.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "unordered has no output edge".to_string(),
        })?;
        loop {
            let message = input.recv().await?;
            let is_exhausted = message.is_exhausted();
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
    fn builds_with_no_arguments() {
        let config = serde_json::json!({"args": [], "kwargs": {}});
        assert!(Unordered::build(&config).is_ok());
    }

    #[test]
    fn optimize_requests_unordered_and_passes_filter_through() {
        let predicate = Expr::literal(tql_df_value::Value::Bool(true));
        let outcome = Unordered.optimize(Some(predicate), EventOrder::Ordered);
        match outcome {
            OptimizeOutcome::Pushed { requested_order, residual_filter, .. } => {
                assert_eq!(requested_order, EventOrder::Unordered);
                assert!(residual_filter.is_some());
            }
            OptimizeOutcome::DoNotOptimize => panic!("expected Pushed"),
        }
    }
}
