// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Casting a record batch to a target schema (§4.1): `cast(batch, target_schema)`.

use crate::batch::RecordBatch;
use crate::error::ValueError;
use crate::schema::Schema;
use arrow_cast::cast::{can_cast_types, cast};
use arrow_schema::DataType;

/// Casts `batch` so that it conforms to `target_schema`, column by column.
///
/// Succeeds only if every column is castable to its corresponding target column type;
/// otherwise fails with a `CastFailed` error naming each offending column and reason.
pub fn cast_batch(batch: &RecordBatch, target_schema: &Schema) -> Result<RecordBatch, ValueError> {
    let target_fields = target_schema.arrow_schema();
    let mut reasons = Vec::new();
    let mut arrays = Vec::with_capacity(target_fields.fields().len());

    for target_field in target_fields.fields() {
        let Some(source) = batch.column_by_name(target_field.name()) else {
            reasons.push(format!(
                "column `{}` missing from source batch",
                target_field.name()
            ));
            continue;
        };
        let target_type: &DataType = target_field.data_type();
        if source.data_type() == target_type {
            arrays.push(source.clone());
            continue;
        }
        if !can_cast_types(source.data_type(), target_type) {
            reasons.push(format!(
                "column `{}`: cannot cast {:?} to {:?}",
                target_field.name(),
                source.data_type(),
                target_type
            ));
            continue;
        }
        match cast(source.as_ref(), target_type) {
            Ok(casted) => arrays.push(casted),
            Err(err) => reasons.push(format!(
                "column `{}`: {err}",
                target_field.name()
            )),
        }
    }

    if !reasons.is_empty() {
        return Err(ValueError::CastFailed { reasons });
    }

    let inner = arrow_array::RecordBatch::try_new(target_fields, arrays)?;
    RecordBatch::from_arrow(target_schema.clone(), inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RecordBatchBuilder;
    use crate::types::{Field, Type};
    use crate::value::Value;

    #[test]
    fn casts_int_to_double() {
        let mut builder = RecordBatchBuilder::new();
        builder.field("n").data(Value::from(1i64));
        builder.field("n").data(Value::from(2i64));
        let batches = builder.finish_as_record_batch(None, 1024).unwrap();

        let target =
            Schema::from_record_type(Type::record(vec![Field::new("n", Type::double())]))
                .unwrap();
        let casted = cast_batch(&batches[0], &target).unwrap();
        assert_eq!(casted.rows(), 2);
    }

    #[test]
    fn fails_on_uncastable_column() {
        let mut builder = RecordBatchBuilder::new();
        builder.field("tags").data(Value::List(vec![Value::from("a")]));
        let batches = builder.finish_as_record_batch(None, 1024).unwrap();

        let target =
            Schema::from_record_type(Type::record(vec![Field::new("tags", Type::int64())]))
                .unwrap();
        assert!(cast_batch(&batches[0], &target).is_err());
    }
}
