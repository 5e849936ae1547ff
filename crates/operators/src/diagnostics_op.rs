// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! `diagnostics` (§6.4): the aspect source exposing buffered diagnostics from the current
//! pipeline run's own [`tql_df_diagnostics::DiagnosticSession`] sink.

use crate::error::Error;
use async_trait::async_trait;
use tql_df_config::ElementType;
use tql_df_diagnostics::Diagnostic;
use tql_df_engine::{Error as EngineError, Message, Operator, OperatorContext, OperatorErrorKind, OperatorIo, OperatorLocation, Signature};
use tql_df_value::{batches_from_rows, Value, DEFAULT_BATCH_ROW_CAP};

/// The `diagnostics` aspect source.
pub struct Diagnostics;

impl Diagnostics {
    /// Builds a `diagnostics` operator; this aspect source takes no arguments.
    pub fn build(_config: &serde_json::Value) -> Result<Self, Error> {
        Ok(Self)
    }
}

fn diagnostic_row(diagnostic: &Diagnostic) -> Value {
    let severity = format!("{:?}", diagnostic.severity).to_lowercase();
    let (source, offset, length) = diagnostic.location.as_ref().map_or((Value::Null, Value::Null, Value::Null), |loc| {
        (
            loc.source.clone().map_or(Value::Null, Value::from),
            loc.offset.map_or(Value::Null, |o| Value::Uint64(o as u64)),
            loc.length.map_or(Value::Null, |l| Value::Uint64(l as u64)),
        )
    });
    let notes: Vec<&str> = diagnostic
        .annotations
        .iter()
        .filter(|a| !a.is_hint)
        .map(|a| a.text.as_str())
        .collect();
    let hints: Vec<&str> = diagnostic
        .annotations
        .iter()
        .filter(|a| a.is_hint)
        .map(|a| a.text.as_str())
        .collect();
    Value::Record(vec![
        ("severity".to_string(), Value::from(severity.as_str())),
        ("message".to_string(), Value::from(diagnostic.message.as_str())),
        ("source".to_string(), source),
        ("offset".to_string(), offset),
        ("length".to_string(), length),
        ("notes".to_string(), Value::from(notes.join("; ").as_str())),
        ("hints".to_string(), Value::from(hints.join("; ").as_str())),
        (
            "docs".to_string(),
            diagnostic.docs.clone().map_or(Value::Null, Value::from),
        ),
    ])
}

#[async_trait(?Send)]
impl Operator for Diagnostics {
    fn name(&self) -> &'static str {
        "diagnostics"
    }

    fn signature(&self) -> Signature {
        Signature::SOURCE
    }

    fn location(&self) -> OperatorLocation {
        OperatorLocation::Remote
    }

    fn infer_type(&self, _input: ElementType) -> Result<ElementType, EngineError> {
        Ok(ElementType::RecordBatch)
    }

    async fn run(self: Box<Self>, io: OperatorIo, ctx: OperatorContext) -> Result<(), EngineError> {
        let output = io.output.ok_or_else(|| EngineError::OperatorError {
            operator: self.name().to_string(),
            kind: OperatorErrorKind::Open,
            message: "diagnostics has no output edge".to_string(),
        })?;
        let rows: Vec<Value> = ctx.diagnostics.snapshot().iter().map(diagnostic_row).collect();
        if !rows.is_empty() {
            let batches = batches_from_rows(&rows, "diagnostics".to_string(), DEFAULT_BATCH_ROW_CAP)?;
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
    use tql_df_diagnostics::DiagnosticSession;

    #[test]
    fn renders_notes_and_hints() {
        let session = DiagnosticSession::new("p", 16);
        Diagnostic::warning("bad field")
            .note("left side is int64")
            .hint("use `cast`")
            .emit(&session);
        let snapshot = session.snapshot();
        let row = diagnostic_row(&snapshot[0]);
        let Value::Record(fields) = row else { panic!("expected a record") };
        assert!(fields.contains(&("notes".to_string(), Value::from("left side is int64"))));
        assert!(fields.contains(&("hints".to_string(), Value::from("use `cast`"))));
    }
}
