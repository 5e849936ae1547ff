// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! A series (§4.2): a typed column of a batch's length, produced by evaluating an expression.

use tql_df_value::{Type, Value};

/// A typed, row-oriented column. Evaluation works row-by-row (matching the per-row failure
/// semantics of §4.2: a runtime type error yields `null` for that row rather than aborting
/// the whole batch) and is only materialized into an Arrow array when a downstream consumer
/// needs one (e.g. the set/select operator writing a new batch column).
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// The declared or inferred element type.
    pub ty: Type,
    /// One value per row.
    pub values: Vec<Value>,
}

impl Series {
    /// Builds a series from an explicit type and values.
    #[must_use]
    pub const fn new(ty: Type, values: Vec<Value>) -> Self {
        Self { ty, values }
    }

    /// Builds an all-null series of the given length with an unknown (`null`) type.
    #[must_use]
    pub fn nulls(len: usize) -> Self {
        Self {
            ty: Type::null(),
            values: vec![Value::Null; len],
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether this series has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
