// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! `cast <field>:<type>, ...` (§4.7, §8 property 7: idempotence on conforming input): casts a
//! batch's named columns to declared target types, using [`tql_df_value::cast_batch`].

use crate::error::Error;
use async_trait::async_trait;
use tql_df_config::ElementType;
use tql_df_engine::{Error as EngineError, Message, Operator, OperatorContext, OperatorErrorKind, OperatorIo, Signature};
use tql_df_value::{cast_batch, Field, Schema, Type};

fn type_from_name(name: &str) -> Option<Type> {
    Some(match name {
        "bool" => Type::bool(),
        "int64" => Type::int64(),
        "uint64" => Type::uint64(),
        "double" => Type::double(),
        "duration" => Type::duration(),
        "time" => Type::time(),
        "string" => Type::string(),
        "ip" => Type::ip(),
        "subnet" => Type::subnet(),
        "blob" => Type::blob(),
        "secret" => Type::secret(),
        _ => return None,
    })
}

/// The `cast` operator.
pub struct Cast {
    target: Schema,
}

impl Cast {
    /// Builds a `cast` operator from its config: one `field=type_name` keyword argument per
    /// target column.
    pub fn build(config: &serde_json::Value) -> Result<Self, Error> {
        let kwargs = config["kwargs"].as_object().ok_or(Error::MissingArgument {
            operator: "cast",
            argument: "fields",
        })?;
        let mut fields = Vec::with_capacity(kwargs.len());
        for (name, value) in kwargs {
            let type_name = value.as_str().ok_or(Error::InvalidArgument {
                operator: "cast",
                argument: "type",
                message: format!("field `{name}` expects a type name"),
            })?;
            let ty = type_from_name(type_name).ok_or_else(|| Error::UnknownName {
                operator: "cast",
                name: type_name.to_string(),
            })?;
            fields.push(Field::new(name.clone(), ty));
        }
        let target = Schema::from_record_type(Type::record(fields))?;
        crate::schema_catalog::schema_catalog().register(&target);
        Ok(Self { target })
    }
}

#[async_trait(?Send)]
impl Operator for Cast {
    fn name(&self) -> &'static str {
        "cast"
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
                message: format!("`cast` requires record batches, got {input:?}"),
            })
        }
    }

    async fn run(self: Box<Self>, io: OperatorIo, _ctx: OperatorContext) -> Result<(), EngineError> {
        let input = io.input.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "cast has no input edge".to_string(),
        })?;
        let output = io.output.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "cast has no output edge".to_string(),
        })?;
        loop {
            match input.recv().await? {
                Message::RecordBatch(batch) => {
                    let casted = cast_batch(&batch, &self.target)?;
                    output.send(Message::RecordBatch(casted)).await?;
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
    fn builds_target_schema_from_kwargs() {
        let config = serde_json::json!({"args": [], "kwargs": {"n": "double"}});
        let cast = Cast::build(&config).unwrap();
        assert_eq!(cast.target.fields().len(), 1);
    }

    #[test]
    fn rejects_unknown_type_name() {
        let config = serde_json::json!({"args": [], "kwargs": {"n": "not_a_type"}});
        assert!(matches!(Cast::build(&config), Err(Error::UnknownName { .. })));
    }
}
