// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Flattening nested records by joining field names (§4.1): `flatten(batch, separator)`.

use crate::batch::RecordBatch;
use crate::error::ValueError;
use crate::schema::Schema;
use arrow_array::{Array, ArrayRef, StructArray};
use arrow_schema::{DataType, Field as ArrowField};
use std::collections::HashSet;
use std::sync::Arc;

/// Expands every nested record (struct) column in `batch` into top-level columns named by
/// joining the path with `separator`. List and map columns are left untouched. Conflicting
/// flattened names collapse to the first column seen; the conflict is reported once.
pub fn flatten(batch: &RecordBatch, separator: &str) -> Result<(RecordBatch, Vec<String>), ValueError> {
    let mut out_fields = Vec::new();
    let mut out_arrays: Vec<ArrayRef> = Vec::new();
    let mut seen = HashSet::new();
    let mut conflicts = Vec::new();

    for (field, array) in batch
        .schema()
        .arrow_schema()
        .fields()
        .iter()
        .zip(batch.columns().iter())
    {
        flatten_column(
            field.name(),
            field,
            array,
            separator,
            &mut out_fields,
            &mut out_arrays,
            &mut seen,
            &mut conflicts,
        );
    }

    let arrow_schema = Arc::new(arrow_schema::Schema::new(out_fields));
    let inner = arrow_array::RecordBatch::try_new(Arc::clone(&arrow_schema), out_arrays)?;
    let schema = Schema::from_arrow_schema(arrow_schema)?;
    let flattened = RecordBatch::from_arrow(schema, inner)?;
    Ok((flattened, conflicts))
}

#[allow(clippy::too_many_arguments)]
fn flatten_column(
    path: &str,
    field: &ArrowField,
    array: &ArrayRef,
    separator: &str,
    out_fields: &mut Vec<ArrowField>,
    out_arrays: &mut Vec<ArrayRef>,
    seen: &mut HashSet<String>,
    conflicts: &mut Vec<String>,
) {
    if let DataType::Struct(nested_fields) = field.data_type() {
        let struct_array = array
            .as_any()
            .downcast_ref::<StructArray>()
            .expect("DataType::Struct backed by StructArray");
        for (i, nested_field) in nested_fields.iter().enumerate() {
            let child_path = format!("{path}{separator}{}", nested_field.name());
            flatten_column(
                &child_path,
                nested_field,
                struct_array.column(i),
                separator,
                out_fields,
                out_arrays,
                seen,
                conflicts,
            );
        }
        return;
    }

    if !seen.insert(path.to_string()) {
        conflicts.push(path.to_string());
        return;
    }
    out_fields.push(ArrowField::new(path, field.data_type().clone(), true));
    out_arrays.push(Arc::clone(array));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RecordBatchBuilder;
    use crate::value::Value;

    #[test]
    fn flattens_nested_record_with_separator() {
        let mut builder = RecordBatchBuilder::new();
        builder.field("host").data(Value::Record(vec![
            ("name".to_string(), Value::from("a")),
            ("ip".to_string(), Value::from("1.2.3.4")),
        ]));
        let batches = builder.finish_as_record_batch(None, 1024).unwrap();

        let (flat, conflicts) = flatten(&batches[0], ".").unwrap();
        assert!(conflicts.is_empty());
        assert!(flat.column_by_name("host.name").is_some());
        assert!(flat.column_by_name("host.ip").is_some());
    }

    #[test]
    fn reports_conflicting_flattened_names_once() {
        let mut builder = RecordBatchBuilder::new();
        builder.field("a.b").data(Value::from(1i64));
        builder.field("a").data(Value::Record(vec![(
            "b".to_string(),
            Value::from(2i64),
        )]));
        let batches = builder.finish_as_record_batch(None, 1024).unwrap();

        let (_, conflicts) = flatten(&batches[0], ".").unwrap();
        assert_eq!(conflicts, vec!["a.b".to_string()]);
    }
}
