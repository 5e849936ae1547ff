// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The builtin scalar function registry (§4.2): a `HashMap<&'static str, Factory>`-style
//! registry built once from a static list, not global dynamic constructors (§9).

use crate::error::ExprError;
use ahash::AHashMap;
use std::sync::Arc;
use tql_df_value::Value;
use uuid::Uuid;

/// A scalar builtin function: given already-evaluated argument values for one row, produces
/// the result value for that row.
pub trait Function: Send + Sync {
    /// Stable function name, as used in TQL source.
    fn name(&self) -> &'static str;

    /// Whether repeated calls with the same arguments always produce the same result.
    /// Non-deterministic functions (e.g. `uuid()` without a fixed namespace) disable certain
    /// optimizations (§4.2).
    fn is_deterministic(&self) -> bool {
        true
    }

    /// Evaluates the function for one row's worth of already-evaluated arguments.
    fn call(&self, args: &[Value]) -> Result<Value, ExprError>;
}

/// The set of builtin scalar functions, keyed by name. Cheap to clone: each entry is a
/// reference-counted trait object.
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: AHashMap<&'static str, Arc<dyn Function>>,
}

impl FunctionRegistry {
    /// Builds the registry from the static builtin list (§4.2).
    #[must_use]
    pub fn with_builtins() -> Self {
        let builtins: Vec<Arc<dyn Function>> = vec![
            Arc::new(IntFn),
            Arc::new(DurationFn),
            Arc::new(SubnetFn),
            Arc::new(UuidFn),
            Arc::new(FileNameFn),
            Arc::new(ParentDirFn),
            Arc::new(StartsWithFn),
            Arc::new(EndsWithFn),
            Arc::new(PrependFn),
            Arc::new(AppendFn),
            Arc::new(ConcatenateFn),
            Arc::new(OcsfCategoryUidFn),
            Arc::new(OcsfClassUidFn),
        ];
        let mut functions = AHashMap::new();
        for function in builtins {
            let _ = functions.insert(function.name(), function);
        }
        Self { functions }
    }

    /// Looks up a function by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.functions.get(name).cloned()
    }

    /// Returns every registered function name, for the `plugins` aspect source (§6.4).
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.functions.keys().copied().collect()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn arity_err(name: &'static str, expected: usize, found: usize) -> ExprError {
    ExprError::ArityMismatch {
        name: name.to_string(),
        expected,
        found,
    }
}

fn type_err(name: &'static str, index: usize, message: impl Into<String>) -> ExprError {
    ExprError::ArgumentType {
        name: name.to_string(),
        index,
        message: message.into(),
    }
}

struct IntFn;
impl Function for IntFn {
    fn name(&self) -> &'static str {
        "int"
    }
    fn call(&self, args: &[Value]) -> Result<Value, ExprError> {
        let [value] = args else {
            return Err(arity_err(self.name(), 1, args.len()));
        };
        Ok(match value {
            Value::Null => Value::Null,
            Value::Int64(v) => Value::Int64(*v),
            Value::Uint64(v) => Value::Int64(*v as i64),
            Value::Double(v) => Value::Int64(*v as i64),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int64)
                .unwrap_or(Value::Null),
            Value::Bool(b) => Value::Int64(i64::from(*b)),
            other => return Err(type_err(self.name(), 0, format!("cannot convert {other:?} to int"))),
        })
    }
}

struct DurationFn;
impl Function for DurationFn {
    fn name(&self) -> &'static str {
        "duration"
    }
    fn call(&self, args: &[Value]) -> Result<Value, ExprError> {
        let [value] = args else {
            return Err(arity_err(self.name(), 1, args.len()));
        };
        Ok(match value {
            Value::Null => Value::Null,
            Value::String(s) => humantime::parse_duration(s.trim())
                .ok()
                .and_then(|d| i64::try_from(d.as_nanos()).ok())
                .map(Value::Duration)
                .unwrap_or(Value::Null),
            Value::Int64(ns) => Value::Duration(*ns),
            other => {
                return Err(type_err(
                    self.name(),
                    0,
                    format!("cannot convert {other:?} to duration"),
                ));
            }
        })
    }
}

struct SubnetFn;
impl Function for SubnetFn {
    fn name(&self) -> &'static str {
        "subnet"
    }
    fn call(&self, args: &[Value]) -> Result<Value, ExprError> {
        let [value] = args else {
            return Err(arity_err(self.name(), 1, args.len()));
        };
        Ok(match value {
            Value::Null => Value::Null,
            Value::String(s) => s
                .trim()
                .parse::<ipnet::IpNet>()
                .map(Value::Subnet)
                .unwrap_or(Value::Null),
            other => {
                return Err(type_err(
                    self.name(),
                    0,
                    format!("cannot convert {other:?} to subnet"),
                ));
            }
        })
    }
}

struct UuidFn;
impl Function for UuidFn {
    fn name(&self) -> &'static str {
        "uuid"
    }
    fn is_deterministic(&self) -> bool {
        false
    }
    fn call(&self, args: &[Value]) -> Result<Value, ExprError> {
        let version = match args {
            [] => "v4".to_string(),
            [Value::String(s)] => s.clone(),
            [Value::Null] => "v4".to_string(),
            _ => return Err(arity_err(self.name(), 1, args.len())),
        };
        let uuid = match version.as_str() {
            "v4" => Uuid::new_v4(),
            "v7" => Uuid::now_v7(),
            "nil" => Uuid::nil(),
            "v1" => Uuid::now_v7(), // v1 requires a node id; approximate with a time-ordered id.
            other => {
                return Err(type_err(self.name(), 0, format!("unknown uuid version `{other}`")));
            }
        };
        Ok(Value::String(uuid.to_string()))
    }
}

struct FileNameFn;
impl Function for FileNameFn {
    fn name(&self) -> &'static str {
        "file_name"
    }
    fn call(&self, args: &[Value]) -> Result<Value, ExprError> {
        let [Value::String(path)] = args else {
            return Err(arity_err(self.name(), 1, args.len()));
        };
        Ok(std::path::Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| Value::String(n.to_string()))
            .unwrap_or(Value::Null))
    }
}

struct ParentDirFn;
impl Function for ParentDirFn {
    fn name(&self) -> &'static str {
        "parent_dir"
    }
    fn call(&self, args: &[Value]) -> Result<Value, ExprError> {
        let [Value::String(path)] = args else {
            return Err(arity_err(self.name(), 1, args.len()));
        };
        Ok(std::path::Path::new(path)
            .parent()
            .and_then(|p| p.to_str())
            .map(|n| Value::String(n.to_string()))
            .unwrap_or(Value::Null))
    }
}

struct StartsWithFn;
impl Function for StartsWithFn {
    fn name(&self) -> &'static str {
        "starts_with"
    }
    fn call(&self, args: &[Value]) -> Result<Value, ExprError> {
        let [Value::String(s), Value::String(prefix)] = args else {
            return Err(arity_err(self.name(), 2, args.len()));
        };
        Ok(Value::Bool(s.starts_with(prefix.as_str())))
    }
}

struct EndsWithFn;
impl Function for EndsWithFn {
    fn name(&self) -> &'static str {
        "ends_with"
    }
    fn call(&self, args: &[Value]) -> Result<Value, ExprError> {
        let [Value::String(s), Value::String(suffix)] = args else {
            return Err(arity_err(self.name(), 2, args.len()));
        };
        Ok(Value::Bool(s.ends_with(suffix.as_str())))
    }
}

struct PrependFn;
impl Function for PrependFn {
    fn name(&self) -> &'static str {
        "prepend"
    }
    fn call(&self, args: &[Value]) -> Result<Value, ExprError> {
        let [Value::String(s), Value::String(prefix)] = args else {
            return Err(arity_err(self.name(), 2, args.len()));
        };
        Ok(Value::String(format!("{prefix}{s}")))
    }
}

struct AppendFn;
impl Function for AppendFn {
    fn name(&self) -> &'static str {
        "append"
    }
    fn call(&self, args: &[Value]) -> Result<Value, ExprError> {
        let [Value::String(s), Value::String(suffix)] = args else {
            return Err(arity_err(self.name(), 2, args.len()));
        };
        Ok(Value::String(format!("{s}{suffix}")))
    }
}

struct ConcatenateFn;
impl Function for ConcatenateFn {
    fn name(&self) -> &'static str {
        "concatenate"
    }
    fn call(&self, args: &[Value]) -> Result<Value, ExprError> {
        let mut out = String::new();
        for (i, arg) in args.iter().enumerate() {
            match arg {
                Value::String(s) => out.push_str(s),
                Value::Null => {}
                other => return Err(type_err(self.name(), i, format!("{other:?} is not a string"))),
            }
        }
        Ok(Value::String(out))
    }
}

/// OCSF category UIDs, a small fixed lookup mirroring the well-known top-level categories.
struct OcsfCategoryUidFn;
impl Function for OcsfCategoryUidFn {
    fn name(&self) -> &'static str {
        "ocsf_category_uid"
    }
    fn call(&self, args: &[Value]) -> Result<Value, ExprError> {
        let [Value::String(name)] = args else {
            return Err(arity_err(self.name(), 1, args.len()));
        };
        Ok(ocsf_category_uid(name).map_or(Value::Null, Value::Uint64))
    }
}

struct OcsfClassUidFn;
impl Function for OcsfClassUidFn {
    fn name(&self) -> &'static str {
        "ocsf_class_uid"
    }
    fn call(&self, args: &[Value]) -> Result<Value, ExprError> {
        let [Value::String(name)] = args else {
            return Err(arity_err(self.name(), 1, args.len()));
        };
        Ok(ocsf_class_uid(name).map_or(Value::Null, Value::Uint64))
    }
}

fn ocsf_category_uid(name: &str) -> Option<u64> {
    Some(match name {
        "system" => 1,
        "findings" => 2,
        "iam" => 3,
        "network" => 4,
        "discovery" => 5,
        "application" => 6,
        _ => return None,
    })
}

fn ocsf_class_uid(name: &str) -> Option<u64> {
    Some(match name {
        "file_system_activity" => 1001,
        "network_activity" => 4001,
        "http_activity" => 4002,
        "dns_activity" => 4003,
        "authentication" => 3002,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_parses_numeric_strings() {
        let registry = FunctionRegistry::with_builtins();
        let f = registry.get("int").unwrap();
        assert_eq!(
            f.call(&[Value::String(" 42 ".to_string())]).unwrap(),
            Value::Int64(42)
        );
        assert_eq!(f.call(&[Value::String("nope".to_string())]).unwrap(), Value::Null);
    }

    #[test]
    fn starts_and_ends_with() {
        let registry = FunctionRegistry::with_builtins();
        let starts = registry.get("starts_with").unwrap();
        assert_eq!(
            starts
                .call(&[Value::from("hello"), Value::from("he")])
                .unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn unknown_function_is_absent() {
        let registry = FunctionRegistry::with_builtins();
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn ocsf_lookups() {
        let registry = FunctionRegistry::with_builtins();
        let f = registry.get("ocsf_class_uid").unwrap();
        assert_eq!(
            f.call(&[Value::from("dns_activity")]).unwrap(),
            Value::Uint64(4003)
        );
    }
}
