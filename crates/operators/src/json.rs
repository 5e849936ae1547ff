// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Converts `serde_json::Value` (the composer's argument representation, §6.1) into
//! `tql_df_value::Value` (the runtime's row representation, §3.1). Used by operators whose
//! arguments embed literal data, e.g. `from`'s event list.

use tql_df_value::Value;

/// Converts one JSON value into its `tql_df_value::Value` equivalent. Integral JSON numbers
/// become `Int64`; all other numbers become `Double`.
#[must_use]
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n.as_i64().map_or_else(
            || Value::Double(n.as_f64().unwrap_or(0.0)),
            Value::Int64,
        ),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(from_json).collect()),
        serde_json::Value::Object(fields) => {
            Value::Record(fields.iter().map(|(k, v)| (k.clone(), from_json(v))).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_nested_object_to_record() {
        let json: serde_json::Value = serde_json::json!({"a": 1, "b": {"c": "x"}});
        let value = from_json(&json);
        assert_eq!(
            value,
            Value::Record(vec![
                ("a".to_string(), Value::Int64(1)),
                ("b".to_string(), Value::Record(vec![("c".to_string(), Value::from("x"))])),
            ])
        );
    }

    #[test]
    fn converts_float_to_double() {
        assert_eq!(from_json(&serde_json::json!(1.5)), Value::Double(1.5));
    }
}
