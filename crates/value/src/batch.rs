// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Record batches: a columnar buffer of events sharing one schema (§3.2), backed by Arrow.

use crate::error::ValueError;
use crate::schema::Schema;
use arrow_array::{Array, ArrayRef, RecordBatch as ArrowRecordBatch};
use std::sync::Arc;

/// An immutable, schema-carrying columnar buffer of events.
///
/// Cheap to clone and slice: both the schema and the underlying Arrow columns are
/// reference-counted.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    schema: Schema,
    inner: ArrowRecordBatch,
}

impl RecordBatch {
    /// Wraps an Arrow record batch with its logical schema. The caller must ensure the two
    /// agree; this is checked only by field count and is meant for internal use by the
    /// builder and cast/flatten kernels.
    pub(crate) fn from_arrow(schema: Schema, inner: ArrowRecordBatch) -> Result<Self, ValueError> {
        if schema.fields().len() != inner.num_columns() {
            return Err(ValueError::TypeMismatch {
                column: "<batch>".to_string(),
                expected: format!("{} columns", schema.fields().len()),
                found: format!("{} columns", inner.num_columns()),
            });
        }
        Ok(Self { schema, inner })
    }

    /// Returns the batch's schema.
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of rows in this batch.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.inner.num_rows()
    }

    /// Number of columns in this batch.
    #[must_use]
    pub fn columns(&self) -> &[ArrayRef] {
        self.inner.columns()
    }

    /// Returns the column at `index`, if present.
    #[must_use]
    pub fn column(&self, index: usize) -> Option<&ArrayRef> {
        self.inner.columns().get(index)
    }

    /// Returns the column named `name`, if present.
    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&ArrayRef> {
        self.inner.column_by_name(name)
    }

    /// Returns a zero-copy slice of `len` rows starting at `offset`.
    #[must_use]
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        Self {
            schema: self.schema.clone(),
            inner: self.inner.slice(offset, len),
        }
    }

    /// Returns the underlying Arrow record batch.
    #[must_use]
    pub const fn arrow(&self) -> &ArrowRecordBatch {
        &self.inner
    }

    /// Returns an empty batch conforming to the given schema.
    #[must_use]
    pub fn empty(schema: Schema) -> Self {
        let arrow = ArrowRecordBatch::new_empty(schema.arrow_schema());
        Self { schema, inner: arrow }
    }
}

impl From<RecordBatch> for ArrowRecordBatch {
    fn from(batch: RecordBatch) -> Self {
        batch.inner
    }
}

/// Splits `inner` into a sequence of batches each with at most `row_cap` rows, each wrapped
/// with the logical `schema` (§4.1: `finish_as_record_batch`'s default 64 Ki row cap).
pub(crate) fn split_into_capped_batches(
    schema: &Schema,
    inner: ArrowRecordBatch,
    row_cap: usize,
) -> Result<Vec<RecordBatch>, ValueError> {
    let total = inner.num_rows();
    if total <= row_cap || row_cap == 0 {
        return Ok(vec![RecordBatch::from_arrow(schema.clone(), inner)?]);
    }
    let mut batches = Vec::with_capacity(total.div_ceil(row_cap));
    let mut offset = 0;
    while offset < total {
        let len = row_cap.min(total - offset);
        batches.push(RecordBatch::from_arrow(
            schema.clone(),
            inner.slice(offset, len),
        )?);
        offset += len;
    }
    Ok(batches)
}
