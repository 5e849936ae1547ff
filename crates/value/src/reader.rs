// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Reading a record batch back into row-oriented [`Value`]s (§4.1), the inverse of
//! [`crate::builder::build_array`]. Used by the expression evaluator, which operates on one
//! row at a time rather than columnar arrays.

use crate::batch::RecordBatch;
use crate::error::ValueError;
use crate::types::{Type, TypeKind};
use crate::value::Value;
use arrow_array::{
    Array, ArrayRef, BinaryArray, BooleanArray, FixedSizeBinaryArray, Float64Array, Int64Array,
    ListArray, StringArray, StructArray, UInt32Array, UInt64Array,
};
use arrow_array::types::{DurationNanosecondType, TimestampNanosecondType};
use std::net::IpAddr;

impl RecordBatch {
    /// Converts every row of this batch into a [`Value::Record`], in column order.
    pub fn to_rows(&self) -> Result<Vec<Value>, ValueError> {
        let fields = self.schema().fields();
        let mut columns = Vec::with_capacity(fields.len());
        for (field, array) in fields.iter().zip(self.columns().iter()) {
            columns.push((field.name.clone(), read_array(&field.ty, array)?));
        }
        let rows = self.rows();
        let mut out = Vec::with_capacity(rows);
        for row in 0..rows {
            let mut entries = Vec::with_capacity(columns.len());
            for (name, values) in &columns {
                entries.push((name.clone(), values[row].clone()));
            }
            out.push(Value::Record(entries));
        }
        Ok(out)
    }
}

/// Reads every element of `array` (logically typed as `ty`) into a `Value`, in order.
fn read_array(ty: &Type, array: &ArrayRef) -> Result<Vec<Value>, ValueError> {
    Ok(match &ty.kind {
        TypeKind::Null => vec![Value::Null; array.len()],
        TypeKind::Bool => downcast::<BooleanArray>(array)?
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Bool))
            .collect(),
        TypeKind::Int64 => downcast::<Int64Array>(array)?
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Int64))
            .collect(),
        TypeKind::Uint64 => downcast::<UInt64Array>(array)?
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Uint64))
            .collect(),
        TypeKind::Double => downcast::<Float64Array>(array)?
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Double))
            .collect(),
        TypeKind::Duration => downcast::<arrow_array::PrimitiveArray<DurationNanosecondType>>(array)?
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Duration))
            .collect(),
        TypeKind::Time => downcast::<arrow_array::PrimitiveArray<TimestampNanosecondType>>(array)?
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Time))
            .collect(),
        TypeKind::String | TypeKind::Secret => downcast::<StringArray>(array)?
            .iter()
            .map(|v| match (v, &ty.kind) {
                (None, _) => Value::Null,
                (Some(s), TypeKind::Secret) => Value::Secret(s.to_string()),
                (Some(s), _) => Value::String(s.to_string()),
            })
            .collect(),
        TypeKind::Pattern(opts) => downcast::<StringArray>(array)?
            .iter()
            .map(|v| {
                v.map_or(Value::Null, |source| {
                    Value::Pattern(crate::types::PatternOptions {
                        source: source.to_string(),
                        case_insensitive: opts.case_insensitive,
                    })
                })
            })
            .collect(),
        TypeKind::Ip => downcast::<FixedSizeBinaryArray>(array)?
            .iter()
            .map(|v| v.map_or(Value::Null, |bytes| Value::Ip(bytes_to_ip(bytes))))
            .collect(),
        TypeKind::Subnet => downcast::<FixedSizeBinaryArray>(array)?
            .iter()
            .map(|v| {
                v.map_or(Value::Null, |bytes| {
                    let addr = bytes_to_ip(&bytes[..16]);
                    Value::Subnet(ipnet::IpNet::new(addr, bytes[16]).unwrap_or_else(|_| {
                        ipnet::IpNet::new(addr, 32).expect("prefix 32 is always valid")
                    }))
                })
            })
            .collect(),
        TypeKind::Blob => downcast::<BinaryArray>(array)?
            .iter()
            .map(|v| v.map_or(Value::Null, |bytes| Value::Blob(bytes.to_vec())))
            .collect(),
        TypeKind::Enumeration(_) => downcast::<UInt32Array>(array)?
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Enumeration))
            .collect(),
        TypeKind::List(elem_ty) => read_list_array(elem_ty, array)?,
        TypeKind::Map(_, _) => {
            vec![Value::Null; array.len()]
        }
        TypeKind::Record(fields) => read_struct_array(fields, array)?,
    })
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef) -> Result<&'a T, ValueError> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| ValueError::UnsupportedArrowType {
        found: format!("{:?}", array.data_type()),
    })
}

fn bytes_to_ip(bytes: &[u8]) -> IpAddr {
    let mut octets = [0u8; 16];
    octets.copy_from_slice(&bytes[..16]);
    let v6 = std::net::Ipv6Addr::from(octets);
    v6.to_ipv4_mapped().map_or(IpAddr::V6(v6), IpAddr::V4)
}

fn read_list_array(elem_ty: &Type, array: &ArrayRef) -> Result<Vec<Value>, ValueError> {
    let list = downcast::<ListArray>(array)?;
    let mut out = Vec::with_capacity(list.len());
    for i in 0..list.len() {
        if list.is_null(i) {
            out.push(Value::Null);
            continue;
        }
        let child = list.value(i);
        let items = read_array(elem_ty, &child)?;
        out.push(Value::List(items));
    }
    Ok(out)
}

fn read_struct_array(fields: &[crate::types::Field], array: &ArrayRef) -> Result<Vec<Value>, ValueError> {
    let structs = downcast::<StructArray>(array)?;
    let mut per_field = Vec::with_capacity(fields.len());
    for (i, field) in fields.iter().enumerate() {
        per_field.push(read_array(&field.ty, structs.column(i))?);
    }
    let mut out = Vec::with_capacity(structs.len());
    for row in 0..structs.len() {
        if structs.is_null(row) {
            out.push(Value::Null);
            continue;
        }
        let entries = fields
            .iter()
            .zip(per_field.iter())
            .map(|(field, values)| (field.name.clone(), values[row].clone()))
            .collect();
        out.push(Value::Record(entries));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RecordBatchBuilder;

    #[test]
    fn round_trips_flat_scalar_columns() {
        let mut builder = RecordBatchBuilder::new();
        builder.field("name").data(Value::from("alice"));
        builder.field("count").data(Value::from(1i64));
        builder.field("name").data(Value::from("bob"));
        builder.field("count").data(Value::from(2i64));
        let batches = builder.finish_as_record_batch(None, 1024).unwrap();

        let rows = batches[0].to_rows().unwrap();
        assert_eq!(
            rows[0],
            Value::Record(vec![
                ("name".to_string(), Value::from("alice")),
                ("count".to_string(), Value::from(1i64)),
            ])
        );
        assert_eq!(
            rows[1],
            Value::Record(vec![
                ("name".to_string(), Value::from("bob")),
                ("count".to_string(), Value::from(2i64)),
            ])
        );
    }

    #[test]
    fn round_trips_nested_record_column() {
        let mut builder = RecordBatchBuilder::new();
        builder.field("host").data(Value::Record(vec![("ip".to_string(), Value::from("10.0.0.1"))]));
        let batches = builder.finish_as_record_batch(None, 1024).unwrap();

        let rows = batches[0].to_rows().unwrap();
        assert_eq!(
            rows[0],
            Value::Record(vec![(
                "host".to_string(),
                Value::Record(vec![("ip".to_string(), Value::from("10.0.0.1"))])
            )])
        );
    }

    #[test]
    fn round_trips_list_column_with_nulls() {
        let mut builder = RecordBatchBuilder::new();
        builder.field("tags").data(Value::List(vec![Value::from("a"), Value::from("b")]));
        builder.field("tags").data(Value::Null);
        let batches = builder.finish_as_record_batch(None, 1024).unwrap();

        let rows = batches[0].to_rows().unwrap();
        assert_eq!(rows[0], Value::Record(vec![("tags".to_string(), Value::List(vec![Value::from("a"), Value::from("b")]))]));
        assert_eq!(rows[1], Value::Record(vec![("tags".to_string(), Value::Null)]));
    }
}
