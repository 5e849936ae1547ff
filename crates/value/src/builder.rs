// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Row-oriented record batch construction (§4.1): accumulate values column by column, then
//! finalize into one or more Arrow-backed record batches.

use crate::batch::{split_into_capped_batches, RecordBatch};
use crate::error::ValueError;
use crate::schema::Schema;
use crate::types::{Field as RecordField, Type, TypeKind};
use crate::value::Value;
use arrow_array::builder::{
    BinaryBuilder, BooleanBuilder, FixedSizeBinaryBuilder, Float64Builder, Int64Builder,
    StringBuilder, UInt32Builder, UInt64Builder,
};
use arrow_array::types::{DurationNanosecondType, TimestampNanosecondType};
use arrow_array::{Array, ArrayRef, NullArray, PrimitiveArray, RecordBatch as ArrowRecordBatch, StructArray};
use arrow_schema::{Field as ArrowField, Fields as ArrowFields};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

/// Default target number of rows per finished record batch (§4.1).
pub const DEFAULT_BATCH_ROW_CAP: usize = 64 * 1024;

/// Accumulates rows for a single named column until the builder is finished.
struct ColumnBuffer {
    declared_type: Option<Type>,
    values: Vec<Value>,
}

/// Builds record batches one field at a time, inferring the schema incrementally unless it
/// was pre-specified (§4.1: `builder.field(name).data(value)`).
pub struct RecordBatchBuilder {
    schema_name: Option<String>,
    columns: Vec<(String, ColumnBuffer)>,
    rows: usize,
}

/// A handle bound to one named column of a `RecordBatchBuilder`.
pub struct FieldBuilder<'a> {
    builder: &'a mut RecordBatchBuilder,
    index: usize,
}

impl RecordBatchBuilder {
    /// Creates an empty builder with no pre-declared schema.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema_name: None,
            columns: Vec::new(),
            rows: 0,
        }
    }

    /// Creates a builder pre-seeded with the given schema's empty columns, in field order.
    #[must_use]
    pub fn with_schema(schema: &Schema) -> Self {
        let mut builder = Self::new();
        for field in schema.fields() {
            builder.columns.push((
                field.name.clone(),
                ColumnBuffer {
                    declared_type: Some(field.ty.clone()),
                    values: Vec::new(),
                },
            ));
        }
        builder
    }

    /// Returns a handle to the named column, creating it (with an inferred type) if absent.
    pub fn field(&mut self, name: &str) -> FieldBuilder<'_> {
        let index = match self.columns.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.columns.push((
                    name.to_string(),
                    ColumnBuffer {
                        declared_type: None,
                        values: Vec::new(),
                    },
                ));
                self.columns.len() - 1
            }
        };
        FieldBuilder {
            builder: self,
            index,
        }
    }

    /// Number of rows accumulated so far (the length of the longest column).
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Finalizes the accumulated columns into one or more record batches, each with at most
    /// `row_cap` rows (use [`DEFAULT_BATCH_ROW_CAP`] for the spec default).
    pub fn finish_as_record_batch(
        self,
        schema_name: impl Into<Option<String>>,
        row_cap: usize,
    ) -> Result<Vec<RecordBatch>, ValueError> {
        let rows = self.rows;
        let mut fields = Vec::with_capacity(self.columns.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len());
        for (name, mut buffer) in self.columns {
            buffer.values.resize(rows, Value::Null);
            let ty = buffer
                .declared_type
                .clone()
                .unwrap_or_else(|| infer_column_type(&buffer.values));
            let array = build_array(&ty, &buffer.values)?;
            fields.push(RecordField::new(name, ty));
            arrays.push(array);
        }
        let record_type = Type::record(fields).named(schema_name.into().unwrap_or_default());
        let schema = Schema::from_record_type(record_type)?;
        let inner = ArrowRecordBatch::try_new(schema.arrow_schema(), arrays)?;
        split_into_capped_batches(&schema, inner, row_cap)
    }
}

impl Default for RecordBatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds one or more record batches from a slice of row values, each expected to be a
/// `Value::Record` (the inverse of [`RecordBatch::to_rows`](crate::batch::RecordBatch::to_rows)).
/// Rows may disagree on field presence and order; missing fields are padded with `null`.
pub fn batches_from_rows(
    rows: &[Value],
    schema_name: impl Into<Option<String>>,
    row_cap: usize,
) -> Result<Vec<RecordBatch>, ValueError> {
    let mut builder = RecordBatchBuilder::new();
    for row in rows {
        let Value::Record(fields) = row else {
            return Err(ValueError::NotARecordType {
                found: format!("{row:?}"),
            });
        };
        for (name, value) in fields {
            builder.field(name).data(value.clone());
        }
        // A row with no fields still advances the row count so it round-trips as an empty
        // record rather than being silently dropped.
        if fields.is_empty() {
            builder.rows += 1;
        }
    }
    builder.finish_as_record_batch(schema_name, row_cap)
}

impl FieldBuilder<'_> {
    /// Appends a value to this column, padding any earlier columns with `null` up to the
    /// common row count first.
    pub fn data(self, value: Value) {
        let (_, buffer) = &mut self.builder.columns[self.index];
        while buffer.values.len() < self.builder.rows {
            buffer.values.push(Value::Null);
        }
        buffer.values.push(value);
        self.builder.rows = self.builder.rows.max(buffer.values.len());
    }
}

fn infer_column_type(values: &[Value]) -> Type {
    values
        .iter()
        .find(|v| !v.is_null())
        .map_or_else(Type::null, Value::infer_type)
}

/// Builds an Arrow array from a logical type and a row-major slice of values, recursively
/// handling list/map/record types. Returns `TypeMismatch` if a non-null value's shape does
/// not match `ty`.
pub(crate) fn build_array(ty: &Type, values: &[Value]) -> Result<ArrayRef, ValueError> {
    Ok(match &ty.kind {
        TypeKind::Null => Arc::new(NullArray::new(values.len())),
        TypeKind::Bool => {
            let mut builder = BooleanBuilder::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Bool(v) => builder.append_value(*v),
                    other => return Err(mismatch("<bool column>", "bool", other)),
                }
            }
            Arc::new(builder.finish())
        }
        TypeKind::Int64 => {
            let mut builder = Int64Builder::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Int64(v) => builder.append_value(*v),
                    other => return Err(mismatch("<int64 column>", "int64", other)),
                }
            }
            Arc::new(builder.finish())
        }
        TypeKind::Uint64 => {
            let mut builder = UInt64Builder::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Uint64(v) => builder.append_value(*v),
                    other => return Err(mismatch("<uint64 column>", "uint64", other)),
                }
            }
            Arc::new(builder.finish())
        }
        TypeKind::Double => {
            let mut builder = Float64Builder::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Double(v) => builder.append_value(*v),
                    other => return Err(mismatch("<double column>", "double", other)),
                }
            }
            Arc::new(builder.finish())
        }
        TypeKind::Duration => {
            let mut data: Vec<Option<i64>> = Vec::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Null => data.push(None),
                    Value::Duration(v) => data.push(Some(*v)),
                    other => return Err(mismatch("<duration column>", "duration", other)),
                }
            }
            Arc::new(PrimitiveArray::<DurationNanosecondType>::from(data))
        }
        TypeKind::Time => {
            let mut data: Vec<Option<i64>> = Vec::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Null => data.push(None),
                    Value::Time(v) => data.push(Some(*v)),
                    other => return Err(mismatch("<time column>", "time", other)),
                }
            }
            Arc::new(PrimitiveArray::<TimestampNanosecondType>::from(data))
        }
        TypeKind::String | TypeKind::Secret => {
            let mut builder = StringBuilder::new();
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::String(v) => builder.append_value(v),
                    Value::Secret(v) => builder.append_value(v),
                    other => return Err(mismatch("<string column>", "string", other)),
                }
            }
            Arc::new(builder.finish())
        }
        TypeKind::Pattern(_) => {
            let mut builder = StringBuilder::new();
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Pattern(opts) => builder.append_value(&opts.source),
                    other => return Err(mismatch("<pattern column>", "pattern", other)),
                }
            }
            Arc::new(builder.finish())
        }
        TypeKind::Ip => {
            let mut builder = FixedSizeBinaryBuilder::new(16);
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Ip(addr) => builder.append_value(ip_to_bytes(*addr))?,
                    other => return Err(mismatch("<ip column>", "ip", other)),
                }
            }
            Arc::new(builder.finish())
        }
        TypeKind::Subnet => {
            let mut builder = FixedSizeBinaryBuilder::new(17);
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Subnet(net) => {
                        let mut bytes = [0u8; 17];
                        bytes[..16].copy_from_slice(&ip_to_bytes(net.network()));
                        bytes[16] = net.prefix_len();
                        builder.append_value(bytes)?;
                    }
                    other => return Err(mismatch("<subnet column>", "subnet", other)),
                }
            }
            Arc::new(builder.finish())
        }
        TypeKind::Blob => {
            let mut builder = BinaryBuilder::new();
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Blob(bytes) => builder.append_value(bytes),
                    other => return Err(mismatch("<blob column>", "blob", other)),
                }
            }
            Arc::new(builder.finish())
        }
        TypeKind::Enumeration(_) => {
            let mut builder = UInt32Builder::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Enumeration(ordinal) => builder.append_value(*ordinal),
                    other => return Err(mismatch("<enumeration column>", "enumeration", other)),
                }
            }
            Arc::new(builder.finish())
        }
        TypeKind::List(elem_ty) => build_list_array(elem_ty, values)?,
        TypeKind::Map(key_ty, value_ty) => build_map_array(key_ty, value_ty, values)?,
        TypeKind::Record(fields) => build_struct_array(fields, values)?,
    })
}

fn mismatch(column: &str, expected: &str, found: &Value) -> ValueError {
    ValueError::TypeMismatch {
        column: column.to_string(),
        expected: expected.to_string(),
        found: format!("{found:?}"),
    }
}

fn ip_to_bytes(addr: IpAddr) -> [u8; 16] {
    match addr {
        IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
        IpAddr::V6(v6) => v6.octets(),
    }
}

fn build_list_array(elem_ty: &Type, values: &[Value]) -> Result<ArrayRef, ValueError> {
    let mut flattened = Vec::new();
    let mut offsets: Vec<i32> = Vec::with_capacity(values.len() + 1);
    let mut validity = Vec::with_capacity(values.len());
    offsets.push(0);
    for value in values {
        match value {
            Value::Null => {
                validity.push(false);
                offsets.push(*offsets.last().expect("non-empty"));
            }
            Value::List(items) => {
                validity.push(true);
                flattened.extend(items.iter().cloned());
                offsets.push(i32::try_from(flattened.len()).expect("list fits in i32 offsets"));
            }
            other => return Err(mismatch("<list column>", "list", other)),
        }
    }
    let child = build_array(elem_ty, &flattened)?;
    let (child_dt, _) = (child.data_type().clone(), ());
    let field = Arc::new(ArrowField::new("item", child_dt, true));
    let offsets_buffer = arrow_buffer::OffsetBuffer::new(offsets.into());
    let nulls = arrow_buffer::NullBuffer::from(validity);
    Ok(Arc::new(arrow_array::ListArray::new(
        field,
        offsets_buffer,
        child,
        Some(nulls),
    )))
}

fn build_map_array(
    key_ty: &Type,
    value_ty: &Type,
    values: &[Value],
) -> Result<ArrayRef, ValueError> {
    let mut keys = Vec::new();
    let mut vals = Vec::new();
    let mut offsets: Vec<i32> = Vec::with_capacity(values.len() + 1);
    let mut validity = Vec::with_capacity(values.len());
    offsets.push(0);
    for value in values {
        match value {
            Value::Null => {
                validity.push(false);
                offsets.push(*offsets.last().expect("non-empty"));
            }
            Value::Map(entries) => {
                validity.push(true);
                for (k, v) in entries {
                    keys.push(k.clone());
                    vals.push(v.clone());
                }
                offsets.push(i32::try_from(keys.len()).expect("map fits in i32 offsets"));
            }
            other => return Err(mismatch("<map column>", "map", other)),
        }
    }
    let key_array = build_array(key_ty, &keys)?;
    let value_array = build_array(value_ty, &vals)?;
    let entries = ArrowFields::from(vec![
        ArrowField::new("key", key_array.data_type().clone(), false),
        ArrowField::new("value", value_array.data_type().clone(), true),
    ]);
    let entries_struct = StructArray::try_new(entries.clone(), vec![key_array, value_array], None)?;
    let entries_field = Arc::new(ArrowField::new(
        "entries",
        arrow_schema::DataType::Struct(entries),
        false,
    ));
    let offsets_buffer = arrow_buffer::OffsetBuffer::new(offsets.into());
    let nulls = arrow_buffer::NullBuffer::from(validity);
    Ok(Arc::new(arrow_array::MapArray::new(
        entries_field,
        offsets_buffer,
        entries_struct,
        Some(nulls),
        false,
    )))
}

fn build_struct_array(fields: &[RecordField], values: &[Value]) -> Result<ArrayRef, ValueError> {
    let mut validity = Vec::with_capacity(values.len());
    let mut per_field: Vec<Vec<Value>> = vec![Vec::with_capacity(values.len()); fields.len()];
    for value in values {
        match value {
            Value::Null => {
                validity.push(false);
                for column in &mut per_field {
                    column.push(Value::Null);
                }
            }
            Value::Record(entries) => {
                validity.push(true);
                for (i, field) in fields.iter().enumerate() {
                    let found = entries
                        .iter()
                        .find(|(name, _)| name == &field.name)
                        .map(|(_, v)| v.clone())
                        .unwrap_or(Value::Null);
                    per_field[i].push(found);
                }
            }
            other => return Err(mismatch("<record column>", "record", other)),
        }
    }
    let mut arrow_fields = Vec::with_capacity(fields.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(fields.len());
    for (field, column) in fields.iter().zip(per_field.into_iter()) {
        let array = build_array(&field.ty, &column)?;
        arrow_fields.push(ArrowField::new(field.name.clone(), array.data_type().clone(), true));
        arrays.push(array);
    }
    let nulls = arrow_buffer::NullBuffer::from(validity);
    Ok(Arc::new(StructArray::try_new(
        ArrowFields::from(arrow_fields),
        arrays,
        Some(nulls),
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_flat_batch() {
        let mut builder = RecordBatchBuilder::new();
        builder.field("name").data(Value::from("alice"));
        builder.field("count").data(Value::from(1i64));
        builder.field("name").data(Value::from("bob"));
        builder.field("count").data(Value::from(2i64));
        let batches = builder
            .finish_as_record_batch("people".to_string(), DEFAULT_BATCH_ROW_CAP)
            .unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].rows(), 2);
    }

    #[test]
    fn batches_from_rows_pads_ragged_schemas() {
        let rows = vec![
            Value::Record(vec![("a".to_string(), Value::from(1i64)), ("b".to_string(), Value::from("x"))]),
            Value::Record(vec![("a".to_string(), Value::from(2i64))]),
        ];
        let batches = batches_from_rows(&rows, None, DEFAULT_BATCH_ROW_CAP).unwrap();
        assert_eq!(batches[0].rows(), 2);
        let b_col = batches[0].column_by_name("b").unwrap();
        assert!(b_col.is_null(1));
    }

    #[test]
    fn pads_missing_values_with_null() {
        let mut builder = RecordBatchBuilder::new();
        builder.field("a").data(Value::from(1i64));
        builder.field("b").data(Value::from(2i64));
        builder.field("a").data(Value::from(3i64));
        let batches = builder
            .finish_as_record_batch(None, DEFAULT_BATCH_ROW_CAP)
            .unwrap();
        assert_eq!(batches[0].rows(), 2);
        let b_col = batches[0].column_by_name("b").unwrap();
        assert_eq!(b_col.len(), 2);
        assert!(b_col.is_null(1));
    }

    #[test]
    fn splits_batches_at_row_cap() {
        let mut builder = RecordBatchBuilder::new();
        for i in 0..10 {
            builder.field("n").data(Value::from(i as i64));
        }
        let batches = builder.finish_as_record_batch(None, 4).unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].rows(), 4);
        assert_eq!(batches[2].rows(), 2);
    }

    #[test]
    fn builds_nested_list_and_record_columns() {
        let mut builder = RecordBatchBuilder::new();
        builder
            .field("tags")
            .data(Value::List(vec![Value::from("a"), Value::from("b")]));
        builder.field("meta").data(Value::Record(vec![(
            "k".to_string(),
            Value::from("v"),
        )]));
        let batches = builder.finish_as_record_batch(None, DEFAULT_BATCH_ROW_CAP).unwrap();
        assert_eq!(batches[0].rows(), 1);
    }
}
