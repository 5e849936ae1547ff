// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! A dynamically-typed scalar value, used as the row-oriented interchange format between the
//! expression evaluator, builders, and literal constants (§3.4, §4.1).

use crate::types::{Enumeration, Field, PatternOptions, Type};
use ipnet::IpNet;
use std::net::IpAddr;

/// A single scalar (or compound) value, tagged the same way as `Type`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The null value, assignable to any type.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed 64-bit integer.
    Int64(i64),
    /// An unsigned 64-bit integer.
    Uint64(u64),
    /// An IEEE-754 double.
    Double(f64),
    /// A signed duration in nanoseconds.
    Duration(i64),
    /// A point in time, UTC nanoseconds since epoch.
    Time(i64),
    /// A UTF-8 string.
    String(String),
    /// A pattern literal (regex source plus options).
    Pattern(PatternOptions),
    /// An IP address.
    Ip(IpAddr),
    /// An IP network.
    Subnet(IpNet),
    /// An opaque byte blob.
    Blob(Vec<u8>),
    /// A secret string, redacted in `Debug`/`Display` contexts outside this module.
    Secret(String),
    /// An enumeration ordinal.
    Enumeration(u32),
    /// A list of values, all of the same element type.
    List(Vec<Value>),
    /// A map of key/value pairs.
    Map(Vec<(Value, Value)>),
    /// An ordered record of named values.
    Record(Vec<(String, Value)>),
}

impl Value {
    /// Returns whether this value is `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Infers the narrowest `Type` that exactly matches this value's shape.
    ///
    /// For `Null` there is no unique answer; callers that need a schema should supply the
    /// expected column type instead of relying on inference.
    #[must_use]
    pub fn infer_type(&self) -> Type {
        match self {
            Self::Null => Type::null(),
            Self::Bool(_) => Type::bool(),
            Self::Int64(_) => Type::int64(),
            Self::Uint64(_) => Type::uint64(),
            Self::Double(_) => Type::double(),
            Self::Duration(_) => Type::duration(),
            Self::Time(_) => Type::time(),
            Self::String(_) => Type::string(),
            Self::Pattern(opts) => {
                Type::new(crate::types::TypeKind::Pattern(opts.clone()))
            }
            Self::Ip(_) => Type::ip(),
            Self::Subnet(_) => Type::subnet(),
            Self::Blob(_) => Type::blob(),
            Self::Secret(_) => Type::secret(),
            Self::Enumeration(ordinal) => Type::new(crate::types::TypeKind::Enumeration(
                Enumeration::new((0..=*ordinal).map(|i| i.to_string()).collect()),
            )),
            Self::List(items) => {
                let elem = items
                    .iter()
                    .find(|v| !v.is_null())
                    .map_or_else(Type::null, Self::infer_type);
                Type::list(elem)
            }
            Self::Map(entries) => {
                let (key_ty, value_ty) = entries
                    .first()
                    .map(|(k, v)| (k.infer_type(), v.infer_type()))
                    .unwrap_or_else(|| (Type::null(), Type::null()));
                Type::map(key_ty, value_ty)
            }
            Self::Record(entries) => Type::record(
                entries
                    .iter()
                    .map(|(name, value)| Field::new(name.clone(), value.infer_type()))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Uint64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl Value {
    /// Converts this value to a tagged JSON form that round-trips exactly via
    /// [`Value::from_checkpoint_json`] (§9 checkpoint protocol). Distinct from the untagged JSON
    /// `from_json` in the operators crate produces for composer literals: that shape is lossy
    /// (e.g. it cannot tell `Int64` from `Uint64`), this one is not.
    #[must_use]
    pub fn to_checkpoint_json(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            Self::Null => json!({"t": "null"}),
            Self::Bool(v) => json!({"t": "bool", "v": v}),
            Self::Int64(v) => json!({"t": "int64", "v": v}),
            Self::Uint64(v) => json!({"t": "uint64", "v": v}),
            Self::Double(v) => json!({"t": "double", "v": v}),
            Self::Duration(v) => json!({"t": "duration", "v": v}),
            Self::Time(v) => json!({"t": "time", "v": v}),
            Self::String(v) => json!({"t": "string", "v": v}),
            Self::Pattern(opts) => json!({"t": "pattern", "source": opts.source, "case_insensitive": opts.case_insensitive}),
            Self::Ip(v) => json!({"t": "ip", "v": v.to_string()}),
            Self::Subnet(v) => json!({"t": "subnet", "v": v.to_string()}),
            Self::Blob(v) => json!({"t": "blob", "v": v}),
            Self::Secret(v) => json!({"t": "secret", "v": v}),
            Self::Enumeration(v) => json!({"t": "enumeration", "v": v}),
            Self::List(items) => json!({"t": "list", "v": items.iter().map(Self::to_checkpoint_json).collect::<Vec<_>>()}),
            Self::Map(entries) => json!({
                "t": "map",
                "v": entries.iter().map(|(k, v)| [k.to_checkpoint_json(), v.to_checkpoint_json()]).collect::<Vec<_>>(),
            }),
            Self::Record(entries) => json!({
                "t": "record",
                "v": entries.iter().map(|(name, v)| (name.clone(), v.to_checkpoint_json())).collect::<serde_json::Map<_, _>>(),
            }),
        }
    }

    /// Reconstructs a value from [`Value::to_checkpoint_json`]'s output. Malformed input (e.g. a
    /// hand-edited checkpoint blob) decodes to `Null` or to the type's zero value rather than
    /// panicking.
    #[must_use]
    pub fn from_checkpoint_json(json: &serde_json::Value) -> Self {
        let Some(tag) = json.get("t").and_then(serde_json::Value::as_str) else {
            return Self::Null;
        };
        match tag {
            "bool" => Self::Bool(json["v"].as_bool().unwrap_or_default()),
            "int64" => Self::Int64(json["v"].as_i64().unwrap_or_default()),
            "uint64" => Self::Uint64(json["v"].as_u64().unwrap_or_default()),
            "double" => Self::Double(json["v"].as_f64().unwrap_or_default()),
            "duration" => Self::Duration(json["v"].as_i64().unwrap_or_default()),
            "time" => Self::Time(json["v"].as_i64().unwrap_or_default()),
            "string" => Self::String(json["v"].as_str().unwrap_or_default().to_string()),
            "pattern" => Self::Pattern(PatternOptions {
                source: json["source"].as_str().unwrap_or_default().to_string(),
                case_insensitive: json["case_insensitive"].as_bool().unwrap_or_default(),
            }),
            "ip" => Self::Ip(
                json["v"]
                    .as_str()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)),
            ),
            "subnet" => Self::Subnet(
                json["v"]
                    .as_str()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| "0.0.0.0/0".parse().expect("valid subnet literal")),
            ),
            "blob" => Self::Blob(
                json["v"]
                    .as_array()
                    .map(|items| items.iter().filter_map(|b| b.as_u64()).map(|b| b as u8).collect())
                    .unwrap_or_default(),
            ),
            "secret" => Self::Secret(json["v"].as_str().unwrap_or_default().to_string()),
            "enumeration" => Self::Enumeration(json["v"].as_u64().unwrap_or_default() as u32),
            "list" => Self::List(
                json["v"]
                    .as_array()
                    .map(|items| items.iter().map(Self::from_checkpoint_json).collect())
                    .unwrap_or_default(),
            ),
            "map" => Self::Map(
                json["v"]
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|pair| {
                                let pair = pair.as_array()?;
                                Some((Self::from_checkpoint_json(pair.first()?), Self::from_checkpoint_json(pair.get(1)?)))
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
            "record" => Self::Record(
                json["v"]
                    .as_object()
                    .map(|fields| fields.iter().map(|(name, v)| (name.clone(), Self::from_checkpoint_json(v))).collect())
                    .unwrap_or_default(),
            ),
            _ => Self::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_scalar_types() {
        assert_eq!(Value::from(1i64).infer_type(), Type::int64());
        assert_eq!(Value::from("x").infer_type(), Type::string());
        assert_eq!(Value::Bool(true).infer_type(), Type::bool());
    }

    #[test]
    fn checkpoint_json_round_trips_nested_values() {
        let value = Value::Record(vec![
            ("n".to_string(), Value::Int64(-4)),
            ("tags".to_string(), Value::List(vec![Value::from("a"), Value::Null])),
        ]);
        let json = value.to_checkpoint_json();
        assert_eq!(Value::from_checkpoint_json(&json), value);
    }

    #[test]
    fn infers_record_type_from_nested_values() {
        let record = Value::Record(vec![("n".to_string(), Value::Int64(1))]);
        let ty = record.infer_type();
        let fields = ty.as_record_fields().unwrap();
        assert_eq!(fields[0].name, "n");
        assert_eq!(fields[0].ty, Type::int64());
    }
}
