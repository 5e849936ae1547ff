// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! `select <fields>` and `set <name>=<expr>, ...` (§4.7): projection and field assignment.
//!
//! `select` keeps only the named fields (or computed expressions, under the expression text as
//! the field name unless a `name=expr` form names it explicitly) and drops everything else.
//! `set` evaluates each assignment and adds or overwrites that field, keeping all other fields
//! untouched.

use crate::error::Error;
use async_trait::async_trait;
use tql_df_config::ElementType;
use tql_df_engine::{Error as EngineError, Message, Operator, OperatorContext, OperatorErrorKind, OperatorIo, Signature};
use tql_df_expr::{eval, Expr, ExprKind};
use tql_df_value::{batches_from_rows, RecordBatch, Value, DEFAULT_BATCH_ROW_CAP};

/// One output column: its name and the expression that computes it.
struct Entry {
    name: String,
    expr: Expr,
}

fn field_name_for(text: &str, expr: &Expr) -> String {
    if let ExprKind::FieldPath(path) = &expr.kind {
        path.last().cloned().unwrap_or_else(|| text.to_string())
    } else {
        text.to_string()
    }
}

fn parse_entries(config: &serde_json::Value, operator: &'static str) -> Result<Vec<Entry>, Error> {
    let mut entries = Vec::new();
    if let Some(args) = config["args"].as_array() {
        for arg in args {
            let text = arg.as_str().ok_or(Error::InvalidArgument {
                operator,
                argument: "fields",
                message: "expected a field expression".to_string(),
            })?;
            let expr = tql_df_pipeline::parse_expr(text)?;
            let name = field_name_for(text, &expr);
            entries.push(Entry { name, expr });
        }
    }
    if let Some(kwargs) = config["kwargs"].as_object() {
        for (name, value) in kwargs {
            let text = value.as_str().ok_or(Error::InvalidArgument {
                operator,
                argument: "assignment",
                message: format!("field `{name}` expects an expression"),
            })?;
            let expr = tql_df_pipeline::parse_expr(text)?;
            entries.push(Entry {
                name: name.clone(),
                expr,
            });
        }
    }
    Ok(entries)
}

fn project(batch: &RecordBatch, entries: &[Entry], ctx: &OperatorContext, keep_unmatched: bool) -> Result<RecordBatch, EngineError> {
    let rows = batch.to_rows()?;
    let mut series = Vec::with_capacity(entries.len());
    for entry in entries {
        series.push((entry.name.as_str(), eval(&entry.expr, &rows, &ctx.functions, Some(&ctx.diagnostics))));
    }
    let mut out_rows = Vec::with_capacity(rows.len());
    for (row_index, row) in rows.iter().enumerate() {
        let mut fields = if keep_unmatched {
            match row {
                Value::Record(fields) => fields.clone(),
                _ => Vec::new(),
            }
        } else {
            Vec::new()
        };
        for (name, column) in &series {
            let value = column.values[row_index].clone();
            if let Some(slot) = fields.iter_mut().find(|(n, _)| n == name) {
                slot.1 = value;
            } else {
                fields.push(((*name).to_string(), value));
            }
        }
        out_rows.push(Value::Record(fields));
    }
    if out_rows.is_empty() {
        return Ok(RecordBatch::empty(batch.schema().clone()));
    }
    let schema_name = batch.schema().name().map(str::to_string);
    let batches = batches_from_rows(&out_rows, schema_name, DEFAULT_BATCH_ROW_CAP)?;
    batches.into_iter().next().map_or_else(|| Ok(RecordBatch::empty(batch.schema().clone())), Ok)
}

/// The `select` projection operator.
pub struct Select {
    entries: Vec<Entry>,
}

impl Select {
    /// Builds a `select` operator from its config.
    pub fn build(config: &serde_json::Value) -> Result<Self, Error> {
        Ok(Self {
            entries: parse_entries(config, "select")?,
        })
    }
}

#[async_trait(?Send)]
impl Operator for Select {
    fn name(&self) -> &'static str {
        "select"
    }

    fn signature(&self) -> Signature {
        Signature::TRANSFORMATION
    }

    fn infer_type(&self, input: ElementType) -> Result<ElementType, EngineError> {
        require_record_batch(self.name(), input)
    }

    async fn run(self: Box<Self>, io: OperatorIo, ctx: OperatorContext) -> Result<(), EngineError> {
        run_projection(self.name(), &self.entries, io, ctx, false).await
    }
}

/// The `set` field-assignment operator.
pub struct Set {
    entries: Vec<Entry>,
}

impl Set {
    /// Builds a `set` operator from its config.
    pub fn build(config: &serde_json::Value) -> Result<Self, Error> {
        Ok(Self {
            entries: parse_entries(config, "set")?,
        })
    }
}

#[async_trait(?Send)]
impl Operator for Set {
    fn name(&self) -> &'static str {
        "set"
    }

    fn signature(&self) -> Signature {
        Signature::TRANSFORMATION
    }

    fn infer_type(&self, input: ElementType) -> Result<ElementType, EngineError> {
        require_record_batch(self.name(), input)
    }

    async fn run(self: Box<Self>, io: OperatorIo, ctx: OperatorContext) -> Result<(), EngineError> {
        run_projection(self.name(), &self.entries, io, ctx, true).await
    }
}

fn require_record_batch(name: &'static str, input: ElementType) -> Result<ElementType, EngineError> {
    if input == ElementType::RecordBatch {
        Ok(ElementType::RecordBatch)
    } else {
        Err(EngineError::TypeClash {
            operator: name.to_string(),
            message: format!("`{name}` requires record batches, got {input:?}"),
        })
    }
}

async fn run_projection(
    name: &'static str,
    entries: &[Entry],
    io: OperatorIo,
    ctx: OperatorContext,
    keep_unmatched: bool,
) -> Result<(), EngineError> {
    let input = io.input.ok_or_else(|| EngineError::OperatorError {
        operator: name.to_string(),
        kind: OperatorErrorKind::Open,
        message: format!("{name} has no input edge"),
    })?;
    let output = io.output.ok_or_else(|| EngineError::OperatorError {
        operator: name.to_string(),
        kind: OperatorErrorKind::Open,
        message: format!("{name} has no output edge"),
    })?;
    loop {
        match input.recv().await? {
            Message::RecordBatch(batch) => {
                let projected = project(&batch, entries, &ctx, keep_unmatched)?;
                output.send(Message::RecordBatch(projected)).await?;
            }
            Message::Exhausted => {
                output.send(Message::Exhausted).await?;
                return Ok(());
            }
            other => output.send(other).await?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_keeps_only_named_fields() {
        let config = serde_json::json!({"args": ["a"], "kwargs": {}});
        let select = Select::build(&config).unwrap();
        assert_eq!(select.entries.len(), 1);
        assert_eq!(select.entries[0].name, "a");
    }

    #[test]
    fn set_parses_named_assignment() {
        let config = serde_json::json!({"args": [], "kwargs": {"b": "int(x)"}});
        let set = Set::build(&config).unwrap();
        assert_eq!(set.entries[0].name, "b");
    }
}
