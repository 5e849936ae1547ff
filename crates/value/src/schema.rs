// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Conversion between the type model (§3.1) and the Arrow columnar schema that backs record
//! batches (§4.1 implementation note).
//!
//! Arrow's `DataType` alone cannot distinguish some of our logical types from their physical
//! representation (e.g. `pattern`/`secret` are both physically `Utf8`, `ip` and `subnet` are
//! both physically fixed-size binary). We tag the logical type on the Arrow `Field`'s metadata
//! under `LOGICAL_TYPE_KEY` so that a schema retains enough information to round-trip.

use crate::error::ValueError;
use crate::types::{Enumeration, Field as RecordField, PatternOptions, Type, TypeKind};
use arrow_schema::{DataType, Field as ArrowField, Fields as ArrowFields, Schema as ArrowSchema};
use std::sync::Arc;

/// Metadata key used to tag a field's logical type when it is not uniquely determined by the
/// Arrow physical `DataType`.
pub const LOGICAL_TYPE_KEY: &str = "tql.logical_type";

/// A named, ordered record type together with its Arrow-native representation.
///
/// Cheap to clone: the Arrow schema is reference-counted.
#[derive(Debug, Clone)]
pub struct Schema {
    record_type: Type,
    arrow: Arc<ArrowSchema>,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.record_type == other.record_type
    }
}

impl Schema {
    /// Builds a `Schema` from a record `Type`. Returns an error if `ty` is not a record type.
    pub fn from_record_type(ty: Type) -> Result<Self, ValueError> {
        let fields = ty
            .as_record_fields()
            .ok_or_else(|| ValueError::NotARecordType {
                found: format!("{:?}", ty.kind),
            })?;
        let arrow_fields: Vec<ArrowField> = fields.iter().map(to_arrow_field).collect();
        let arrow = Arc::new(ArrowSchema::new(arrow_fields));
        Ok(Self {
            record_type: ty,
            arrow,
        })
    }

    /// Returns the logical record type.
    #[must_use]
    pub const fn record_type(&self) -> &Type {
        &self.record_type
    }

    /// Returns the Arrow schema backing this logical schema.
    #[must_use]
    pub fn arrow_schema(&self) -> Arc<ArrowSchema> {
        Arc::clone(&self.arrow)
    }

    /// Returns the stable fingerprint of the underlying record type.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        self.record_type.fingerprint()
    }

    /// Returns the declared name of this schema, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.record_type.name.as_deref()
    }

    /// Returns the ordered field list.
    #[must_use]
    pub fn fields(&self) -> &[RecordField] {
        self.record_type
            .as_record_fields()
            .expect("constructed only from a record type")
    }

    /// Builds a `Schema` directly from an Arrow schema, reconstructing logical types from
    /// each field's physical `DataType` plus any `LOGICAL_TYPE_KEY` metadata tag.
    pub fn from_arrow_schema(arrow: Arc<ArrowSchema>) -> Result<Self, ValueError> {
        let mut fields = Vec::with_capacity(arrow.fields().len());
        for field in arrow.fields() {
            fields.push(RecordField::new(field.name().clone(), from_arrow_field(field)?));
        }
        Ok(Self {
            record_type: Type::record(fields),
            arrow,
        })
    }
}

fn to_arrow_field(field: &RecordField) -> ArrowField {
    let (data_type, logical_tag) = to_arrow_datatype(&field.ty);
    let mut arrow_field = ArrowField::new(field.name.clone(), data_type, true);
    if let Some(tag) = logical_tag {
        arrow_field.set_metadata(
            [(LOGICAL_TYPE_KEY.to_string(), tag)].into_iter().collect(),
        );
    }
    arrow_field
}

/// Maps a logical `Type` to its Arrow physical representation, plus an optional logical-type
/// tag to disambiguate types that share a physical representation.
fn to_arrow_datatype(ty: &Type) -> (DataType, Option<String>) {
    match &ty.kind {
        TypeKind::Null => (DataType::Null, None),
        TypeKind::Bool => (DataType::Boolean, None),
        TypeKind::Int64 => (DataType::Int64, None),
        TypeKind::Uint64 => (DataType::UInt64, None),
        TypeKind::Double => (DataType::Float64, None),
        TypeKind::Duration => (
            DataType::Duration(arrow_schema::TimeUnit::Nanosecond),
            None,
        ),
        TypeKind::Time => (
            DataType::Timestamp(arrow_schema::TimeUnit::Nanosecond, None),
            None,
        ),
        TypeKind::String => (DataType::Utf8, None),
        TypeKind::Pattern(opts) => (
            DataType::Utf8,
            Some(format!(
                "pattern;case_insensitive={}",
                opts.case_insensitive
            )),
        ),
        TypeKind::Ip => (DataType::FixedSizeBinary(16), Some("ip".to_string())),
        TypeKind::Subnet => (DataType::FixedSizeBinary(17), Some("subnet".to_string())),
        TypeKind::Blob => (DataType::Binary, None),
        TypeKind::Secret => (DataType::Utf8, Some("secret".to_string())),
        TypeKind::Enumeration(e) => {
            let names = (0..e.len() as u32)
                .map(|i| e.name(i).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(",");
            (DataType::UInt32, Some(format!("enumeration;{names}")))
        }
        TypeKind::List(elem) => {
            let (inner, tag) = to_arrow_datatype(elem);
            let mut inner_field = ArrowField::new("item", inner, true);
            if let Some(tag) = tag {
                inner_field
                    .set_metadata([(LOGICAL_TYPE_KEY.to_string(), tag)].into_iter().collect());
            }
            (DataType::List(Arc::new(inner_field)), None)
        }
        TypeKind::Map(key, value) => {
            let (key_dt, _) = to_arrow_datatype(key);
            let (value_dt, _) = to_arrow_datatype(value);
            let entries = ArrowFields::from(vec![
                ArrowField::new("key", key_dt, false),
                ArrowField::new("value", value_dt, true),
            ]);
            let entries_field = ArrowField::new("entries", DataType::Struct(entries), false);
            (DataType::Map(Arc::new(entries_field), false), None)
        }
        TypeKind::Record(record_fields) => {
            let arrow_fields: ArrowFields = record_fields
                .iter()
                .map(to_arrow_field)
                .collect::<Vec<_>>()
                .into();
            (DataType::Struct(arrow_fields), None)
        }
    }
}

fn from_arrow_field(field: &ArrowField) -> Result<Type, ValueError> {
    let logical_tag = field.metadata().get(LOGICAL_TYPE_KEY).cloned();
    from_arrow_datatype(field.data_type(), logical_tag.as_deref())
}

fn from_arrow_datatype(dt: &DataType, logical_tag: Option<&str>) -> Result<Type, ValueError> {
    if let Some(tag) = logical_tag {
        if tag == "ip" {
            return Ok(Type::ip());
        }
        if tag == "subnet" {
            return Ok(Type::subnet());
        }
        if tag == "secret" {
            return Ok(Type::secret());
        }
        if let Some(rest) = tag.strip_prefix("pattern;case_insensitive=") {
            return Ok(Type::new(TypeKind::Pattern(PatternOptions {
                source: String::new(),
                case_insensitive: rest == "true",
            })));
        }
        if let Some(rest) = tag.strip_prefix("enumeration;") {
            let names = rest
                .split(',')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            return Ok(Type::new(TypeKind::Enumeration(Enumeration::new(names))));
        }
    }
    Ok(match dt {
        DataType::Null => Type::null(),
        DataType::Boolean => Type::bool(),
        DataType::Int64 => Type::int64(),
        DataType::UInt32 => Type::new(TypeKind::Enumeration(Enumeration::new(Vec::new()))),
        DataType::UInt64 => Type::uint64(),
        DataType::Float64 => Type::double(),
        DataType::Duration(_) => Type::duration(),
        DataType::Timestamp(_, _) => Type::time(),
        DataType::Utf8 => Type::string(),
        DataType::Binary | DataType::LargeBinary => Type::blob(),
        DataType::FixedSizeBinary(16) => Type::ip(),
        DataType::FixedSizeBinary(17) => Type::subnet(),
        DataType::List(inner) => {
            let elem = from_arrow_field(inner)?;
            Type::list(elem)
        }
        DataType::Map(entries, _) => {
            let DataType::Struct(kv) = entries.data_type() else {
                return Err(ValueError::UnsupportedArrowType {
                    found: format!("{dt:?}"),
                });
            };
            let key = from_arrow_field(&kv[0])?;
            let value = from_arrow_field(&kv[1])?;
            Type::map(key, value)
        }
        DataType::Struct(fields) => {
            let mut out = Vec::with_capacity(fields.len());
            for field in fields {
                out.push(RecordField::new(field.name().clone(), from_arrow_field(field)?));
            }
            Type::record(out)
        }
        other => {
            return Err(ValueError::UnsupportedArrowType {
                found: format!("{other:?}"),
            });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;

    #[test]
    fn roundtrips_flat_schema() {
        let ty = Type::record(vec![
            Field::new("name", Type::string()),
            Field::new("count", Type::int64()),
            Field::new("src_ip", Type::ip()),
        ]);
        let schema = Schema::from_record_type(ty.clone()).unwrap();
        let back = Schema::from_arrow_schema(schema.arrow_schema()).unwrap();
        assert_eq!(back.record_type(), &ty);
    }

    #[test]
    fn roundtrips_nested_record() {
        let ty = Type::record(vec![Field::new(
            "labels",
            Type::list(Type::record(vec![Field::new("key", Type::string())])),
        )]);
        let schema = Schema::from_record_type(ty.clone()).unwrap();
        let back = Schema::from_arrow_schema(schema.arrow_schema()).unwrap();
        assert_eq!(back.record_type(), &ty);
    }

    #[test]
    fn rejects_non_record_type() {
        assert!(Schema::from_record_type(Type::int64()).is_err());
    }
}
