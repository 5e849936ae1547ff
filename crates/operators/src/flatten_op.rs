// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! `flatten [separator]` (§4.7, §8: `flatten∘flatten≡flatten`): expands nested records into
//! top-level dotted columns via [`tql_df_value::flatten`].

use crate::error::Error;
use async_trait::async_trait;
use tql_df_config::ElementType;
use tql_df_engine::{Error as EngineError, Message, Operator, OperatorContext, OperatorErrorKind, OperatorIo, Signature};
use tql_df_value::flatten;
use tql_df_diagnostics::Diagnostic;

const DEFAULT_SEPARATOR: &str = ".";

/// The `flatten` operator.
pub struct Flatten {
    separator: String,
}

impl Flatten {
    /// Builds a `flatten` operator from its config: an optional positional separator
    /// argument, defaulting to `.`.
    pub fn build(config: &serde_json::Value) -> Result<Self, Error> {
        let separator = config["args"][0].as_str().unwrap_or(DEFAULT_SEPARATOR).to_string();
        if separator.is_empty() {
            return Err(Error::InvalidArgument {
                operator: "flatten",
                argument: "separator",
                message: "separator must not be empty".to_string(),
            });
        }
        Ok(Self { separator })
    }
}

#[async_trait(?Send)]
impl Operator for Flatten {
    fn name(&self) -> &'static str {
        "flatten"
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
                message: format!("`flatten` requires record batches, got {input:?}"),
            })
        }
    }

    async fn run(self: Box<Self>, io: OperatorIo, ctx: OperatorContext) -> Result<(), EngineError> {
        let input = io.input.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "flatten has no input edge".to_string(),
        })?;
        let output = io.output.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "flatten has no output edge".to_string(),
        })?;
        loop {
            match input.recv().await? {
                Message::RecordBatch(batch) => {
                    let (flattened, conflicts) = flatten(&batch, &self.separator)?;
                    for name in conflicts {
                        let _ = Diagnostic::warning(format!("flattened column name `{name}` collides with an existing column"))
                            .emit(&ctx.diagnostics);
                    }
                    output.send(Message::RecordBatch(flattened)).await?;
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
    fn defaults_separator_to_dot() {
        let config = serde_json::json!({"args": [], "kwargs": {}});
        let op = Flatten::build(&config).unwrap();
        assert_eq!(op.separator, ".");
    }

    #[test]
    fn rejects_empty_separator() {
        let config = serde_json::json!({"args": [""], "kwargs": {}});
        assert!(matches!(Flatten::build(&config), Err(Error::InvalidArgument { .. })));
    }
}
