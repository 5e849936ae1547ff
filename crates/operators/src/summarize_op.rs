// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! `summarize by <fields> <name>=<agg>(<expr>), ...` (§4.7): groups rows by a set of key
//! fields and reduces each group through one or more named aggregations (§4.2).

use crate::error::Error;
use async_trait::async_trait;
use tql_df_config::ElementType;
use tql_df_engine::{Error as EngineError, Message, Operator, OperatorContext, OperatorErrorKind, OperatorIo, Signature};
use tql_df_expr::{eval, AggregationRegistry, Expr, ExprKind};
use tql_df_value::{batches_from_rows, Value, DEFAULT_BATCH_ROW_CAP};

struct OutputColumn {
    name: String,
    aggregation: &'static str,
    expr: Expr,
}

/// The `summarize` operator.
pub struct Summarize {
    group_by: Vec<Expr>,
    group_names: Vec<String>,
    columns: Vec<OutputColumn>,
}

impl Summarize {
    /// Builds a `summarize` operator from its config: positional arguments are group-by field
    /// expressions; keyword arguments are `name=aggregation(expr)` reductions.
    pub fn build(config: &serde_json::Value) -> Result<Self, Error> {
        let mut group_by = Vec::new();
        let mut group_names = Vec::new();
        if let Some(args) = config["args"].as_array() {
            for arg in args {
                let text = arg.as_str().ok_or(Error::InvalidArgument {
                    operator: "summarize",
                    argument: "group_by",
                    message: "expected a field expression".to_string(),
                })?;
                let expr = tql_df_pipeline::parse_expr(text)?;
                let name = match &expr.kind {
                    ExprKind::FieldPath(path) => path.last().cloned().unwrap_or_else(|| text.to_string()),
                    _ => text.to_string(),
                };
                group_by.push(expr);
                group_names.push(name);
            }
        }

        let registry = AggregationRegistry::with_builtins();
        let mut columns = Vec::new();
        if let Some(kwargs) = config["kwargs"].as_object() {
            for (name, value) in kwargs {
                let text = value.as_str().ok_or(Error::InvalidArgument {
                    operator: "summarize",
                    argument: "reduction",
                    message: format!("field `{name}` expects an aggregation call"),
                })?;
                let expr = tql_df_pipeline::parse_expr(text)?;
                let ExprKind::Call(aggregation, mut call_args) = expr.kind else {
                    return Err(Error::InvalidArgument {
                        operator: "summarize",
                        argument: "reduction",
                        message: format!("field `{name}` must be an aggregation call, e.g. `sum(x)`"),
                    });
                };
                if call_args.len() != 1 {
                    return Err(Error::InvalidArgument {
                        operator: "summarize",
                        argument: "reduction",
                        message: format!("field `{name}` aggregation must take exactly one argument"),
                    });
                }
                let aggregation: &'static str = match registry.instantiate(&aggregation) {
                    Some(_) => Box::leak(aggregation.into_boxed_str()),
                    None => {
                        return Err(Error::UnknownName {
                            operator: "summarize",
                            name: aggregation,
                        })
                    }
                };
                columns.push(OutputColumn {
                    name: name.clone(),
                    aggregation,
                    expr: call_args.remove(0),
                });
            }
        }
        Ok(Self {
            group_by,
            group_names,
            columns,
        })
    }
}

fn group_key(row: &Value, group_by: &[Expr], ctx: &OperatorContext) -> String {
    group_by
        .iter()
        .map(|expr| {
            let series = eval(expr, std::slice::from_ref(row), &ctx.functions, None);
            format!("{:?}", series.values[0])
        })
        .collect::<Vec<_>>()
        .join("\u{1}")
}

#[async_trait(?Send)]
impl Operator for Summarize {
    fn name(&self) -> &'static str {
        "summarize"
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
                message: format!("`summarize` requires record batches, got {input:?}"),
            })
        }
    }

    async fn run(self: Box<Self>, io: OperatorIo, ctx: OperatorContext) -> Result<(), EngineError> {
        let input = io.input.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "summarize has no input edge".to_string(),
        })?;
        let output = io.output.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "summarize has no output edge".to_string(),
        })?;

        let registry = AggregationRegistry::with_builtins();
        let mut groups: Vec<(Vec<Value>, Vec<Box<dyn tql_df_expr::Aggregation>>)> = Vec::new();
        let mut keys: Vec<String> = Vec::new();

        loop {
            match input.recv().await? {
                Message::RecordBatch(batch) => {
                    let rows = batch.to_rows()?;
                    for row in &rows {
                        let key = group_key(row, &self.group_by, &ctx);
                        let group_index = match keys.iter().position(|k| k == &key) {
                            Some(index) => index,
                            None => {
                                let group_values: Vec<Value> = self
                                    .group_by
                                    .iter()
                                    .map(|expr| eval(expr, std::slice::from_ref(row), &ctx.functions, None).values.remove(0))
                                    .collect();
                                let accumulators: Vec<Box<dyn tql_df_expr::Aggregation>> = self
                                    .columns
                                    .iter()
                                    .map(|column| registry.instantiate(column.aggregation).expect("validated at build time"))
                                    .collect();
                                keys.push(key);
                                groups.push((group_values, accumulators));
                                groups.len() - 1
                            }
                        };
                        let (_, accumulators) = &mut groups[group_index];
                        for (column, accumulator) in self.columns.iter().zip(accumulators.iter_mut()) {
                            let value = eval(&column.expr, std::slice::from_ref(row), &ctx.functions, Some(&ctx.diagnostics))
                                .values
                                .remove(0);
                            accumulator.update(std::slice::from_ref(&value));
                        }
                    }
                }
                Message::Exhausted => break,
                other => output.send(other).await?,
            }
        }

        let mut out_rows = Vec::with_capacity(groups.len());
        for (group_values, accumulators) in &groups {
            let mut fields: Vec<(String, Value)> =
                self.group_names.iter().cloned().zip(group_values.iter().cloned()).collect();
            for (column, accumulator) in self.columns.iter().zip(accumulators.iter()) {
                fields.push((column.name.clone(), accumulator.get()));
            }
            out_rows.push(Value::Record(fields));
        }
        if !out_rows.is_empty() {
            let batches = batches_from_rows(&out_rows, "summarize".to_string(), DEFAULT_BATCH_ROW_CAP)?;
            for batch in batches {
                output.send(Message::RecordBatch(batch)).await?;
            }
        }
        output.send(Message::Exhausted).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_group_by_and_reductions() {
        let config = serde_json::json!({"args": ["k"], "kwargs": {"total": "sum(n)"}});
        let op = Summarize::build(&config).unwrap();
        assert_eq!(op.group_names, vec!["k".to_string()]);
        assert_eq!(op.columns[0].name, "total");
        assert_eq!(op.columns[0].aggregation, "sum");
    }

    #[test]
    fn rejects_unknown_aggregation() {
        let config = serde_json::json!({"args": [], "kwargs": {"total": "nope(n)"}});
        assert!(matches!(Summarize::build(&config), Err(Error::UnknownName { .. })));
    }
}
