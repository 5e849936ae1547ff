// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The expression evaluator (§4.2): walks the AST bottom-up, producing one [`Series`] per
//! node. Field paths resolve via structural lookup against each row and null-propagate
//! through missing intermediate records. Function invocation goes through a
//! [`FunctionRegistry`] keyed by name; a runtime type error fails per row, yielding `null`
//! for that row plus a deduplicated diagnostic, rather than aborting the whole batch.

use crate::ast::{BoolOp, CompareOp, Expr, ExprKind, ListEntry, RecordEntry};
use crate::functions::FunctionRegistry;
use tql_df_diagnostics::{Diagnostic, DiagnosticSession, Location};
use tql_df_value::{Type, Value};

use crate::series::Series;

/// Evaluates `expr` once per row in `rows`, returning a series of the same length.
///
/// `session` is optional: a standalone/test evaluation with no pipeline context can pass
/// `None` and simply receive `null` for rows that fail, with no diagnostic emitted.
#[must_use]
pub fn eval(expr: &Expr, rows: &[Value], functions: &FunctionRegistry, session: Option<&DiagnosticSession>) -> Series {
    let values: Vec<Value> = rows.iter().map(|row| eval_row(expr, row, functions, session)).collect();
    let ty = expr.kind_hint.clone().unwrap_or_else(|| infer_common_type(&values));
    Series::new(ty, values)
}

fn infer_common_type(values: &[Value]) -> Type {
    values
        .iter()
        .find(|v| !v.is_null())
        .map_or_else(Type::null, Value::infer_type)
}

fn eval_row(expr: &Expr, row: &Value, functions: &FunctionRegistry, session: Option<&DiagnosticSession>) -> Value {
    match &expr.kind {
        ExprKind::Literal(value) => value.clone(),
        ExprKind::FieldPath(path) => resolve_field_path(row, path),
        ExprKind::Call(name, arg_exprs) => {
            let args: Vec<Value> = arg_exprs.iter().map(|a| eval_row(a, row, functions, session)).collect();
            match functions.get(name) {
                Some(function) => function.call(&args).unwrap_or_else(|err| {
                    warn_eval_failure(expr, session, format!("call to `{name}` failed: {err}"));
                    Value::Null
                }),
                None => {
                    warn_eval_failure(expr, session, format!("unknown function `{name}`"));
                    Value::Null
                }
            }
        }
        ExprKind::Compare(op, lhs, rhs) => {
            let lhs = eval_row(lhs, row, functions, session);
            let rhs = eval_row(rhs, row, functions, session);
            if lhs.is_null() || rhs.is_null() {
                Value::Null
            } else {
                eval_compare(*op, &lhs, &rhs).map_or_else(
                    || {
                        warn_eval_failure(expr, session, "comparison between incomparable values".to_string());
                        Value::Null
                    },
                    Value::Bool,
                )
            }
        }
        ExprKind::BoolOp(op, lhs, rhs) => {
            let lhs = eval_row(lhs, row, functions, session);
            let rhs = eval_row(rhs, row, functions, session);
            eval_bool_op(*op, &lhs, &rhs)
        }
        ExprKind::Not(inner) => match eval_row(inner, row, functions, session) {
            Value::Bool(b) => Value::Bool(!b),
            Value::Null => Value::Null,
            _ => {
                warn_eval_failure(expr, session, "`not` applied to a non-boolean value".to_string());
                Value::Null
            }
        },
        ExprKind::List(entries) => {
            let mut out = Vec::with_capacity(entries.len());
            for entry in entries {
                match entry {
                    ListEntry::Element(e) => out.push(eval_row(e, row, functions, session)),
                    ListEntry::Spread(e) => match eval_row(e, row, functions, session) {
                        Value::List(items) => out.extend(items),
                        Value::Null => {}
                        _ => warn_eval_failure(expr, session, "spread of a non-list value in list constructor".to_string()),
                    },
                }
            }
            Value::List(out)
        }
        ExprKind::Record(entries) => {
            let mut out: Vec<(String, Value)> = Vec::with_capacity(entries.len());
            for entry in entries {
                match entry {
                    RecordEntry::Field(name, e) => out.push((name.clone(), eval_row(e, row, functions, session))),
                    RecordEntry::Spread(e) => match eval_row(e, row, functions, session) {
                        Value::Record(fields) => out.extend(fields),
                        Value::Null => {}
                        _ => warn_eval_failure(expr, session, "spread of a non-record value in record constructor".to_string()),
                    },
                }
            }
            Value::Record(out)
        }
    }
}

fn resolve_field_path(row: &Value, path: &[String]) -> Value {
    let mut current = row;
    for segment in path {
        match current {
            Value::Record(fields) => match fields.iter().find(|(name, _)| name == segment) {
                Some((_, value)) => current = value,
                None => return Value::Null,
            },
            _ => return Value::Null,
        }
    }
    current.clone()
}

fn eval_compare(op: CompareOp, lhs: &Value, rhs: &Value) -> Option<bool> {
    let ordering = compare_values(lhs, rhs)?;
    Some(match op {
        CompareOp::Eq => ordering == std::cmp::Ordering::Equal,
        CompareOp::Ne => ordering != std::cmp::Ordering::Equal,
        CompareOp::Lt => ordering == std::cmp::Ordering::Less,
        CompareOp::Le => ordering != std::cmp::Ordering::Greater,
        CompareOp::Gt => ordering == std::cmp::Ordering::Greater,
        CompareOp::Ge => ordering != std::cmp::Ordering::Less,
    })
}

fn compare_values(lhs: &Value, rhs: &Value) -> Option<std::cmp::Ordering> {
    match (lhs, rhs) {
        (Value::Int64(a), Value::Int64(b)) => a.partial_cmp(b),
        (Value::Uint64(a), Value::Uint64(b)) => a.partial_cmp(b),
        (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
        (Value::Int64(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
        (Value::Double(a), Value::Int64(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Duration(a), Value::Duration(b)) | (Value::Time(a), Value::Time(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => a.partial_cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
        (Value::Ip(a), Value::Ip(b)) => a.partial_cmp(b),
        _ => None,
    }
}

fn eval_bool_op(op: BoolOp, lhs: &Value, rhs: &Value) -> Value {
    let lhs = as_bool(lhs);
    let rhs = as_bool(rhs);
    match op {
        BoolOp::And => match (lhs, rhs) {
            (Some(false), _) | (_, Some(false)) => Value::Bool(false),
            (Some(true), Some(true)) => Value::Bool(true),
            _ => Value::Null,
        },
        BoolOp::Or => match (lhs, rhs) {
            (Some(true), _) | (_, Some(true)) => Value::Bool(true),
            (Some(false), Some(false)) => Value::Bool(false),
            _ => Value::Null,
        },
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        _ => None,
    }
}

fn warn_eval_failure(expr: &Expr, session: Option<&DiagnosticSession>, message: String) {
    let Some(session) = session else { return };
    let mut builder = Diagnostic::warning(message);
    if let Some(location) = expr.location.clone().or_else(|| Some(Location::named(session.pipeline_id()))) {
        builder = builder.primary(location);
    }
    let _ = builder.emit(session);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CompareOp;

    fn row(fields: Vec<(&str, Value)>) -> Value {
        Value::Record(fields.into_iter().map(|(n, v)| (n.to_string(), v)).collect())
    }

    #[test]
    fn field_path_resolves_nested_records() {
        let functions = FunctionRegistry::with_builtins();
        let expr = Expr::field_path(["src", "ip"]);
        let rows = vec![row(vec![("src", row(vec![("ip", Value::from("10.0.0.1"))]))])];
        let series = eval(&expr, &rows, &functions, None);
        assert_eq!(series.values[0], Value::String("10.0.0.1".to_string()));
    }

    #[test]
    fn field_path_null_propagates_through_missing_record() {
        let functions = FunctionRegistry::with_builtins();
        let expr = Expr::field_path(["src", "ip"]);
        let rows = vec![row(vec![("dst", Value::from("x"))])];
        let series = eval(&expr, &rows, &functions, None);
        assert_eq!(series.values[0], Value::Null);
    }

    #[test]
    fn compare_lt_between_integers() {
        let functions = FunctionRegistry::with_builtins();
        let expr = Expr::new(ExprKind::Compare(
            CompareOp::Lt,
            Box::new(Expr::literal(Value::from(1i64))),
            Box::new(Expr::literal(Value::from(2i64))),
        ));
        let series = eval(&expr, &[Value::Null], &functions, None);
        assert_eq!(series.values[0], Value::Bool(true));
    }

    #[test]
    fn unknown_function_yields_null_without_aborting_row() {
        let functions = FunctionRegistry::with_builtins();
        let expr = Expr::call("does_not_exist", vec![]);
        let series = eval(&expr, &[Value::Null, Value::Null], &functions, None);
        assert_eq!(series.values, vec![Value::Null, Value::Null]);
    }

    #[test]
    fn bool_and_short_circuits_on_false() {
        let functions = FunctionRegistry::with_builtins();
        let expr = Expr::new(ExprKind::BoolOp(
            BoolOp::And,
            Box::new(Expr::literal(Value::Bool(false))),
            Box::new(Expr::literal(Value::Null)),
        ));
        let series = eval(&expr, &[Value::Null], &functions, None);
        assert_eq!(series.values[0], Value::Bool(false));
    }

    #[test]
    fn record_constructor_supports_spread() {
        let functions = FunctionRegistry::with_builtins();
        let expr = Expr::new(ExprKind::Record(vec![
            RecordEntry::Spread(Expr::literal(row(vec![("a", Value::from(1i64))]))),
            RecordEntry::Field("b".to_string(), Expr::literal(Value::from(2i64))),
        ]));
        let series = eval(&expr, &[Value::Null], &functions, None);
        assert_eq!(
            series.values[0],
            Value::Record(vec![
                ("a".to_string(), Value::from(1i64)),
                ("b".to_string(), Value::from(2i64)),
            ])
        );
    }
}
