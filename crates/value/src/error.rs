// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the value crate.

/// Errors that can occur while building, casting, or flattening typed values.
#[derive(thiserror::Error, Debug)]
pub enum ValueError {
    /// A record type was required but something else was given.
    #[error("expected a record type, found {found}")]
    NotARecordType {
        /// Debug rendering of the offending type.
        found: String,
    },

    /// An Arrow `DataType` has no corresponding logical type.
    #[error("unsupported Arrow data type: {found}")]
    UnsupportedArrowType {
        /// Debug rendering of the offending Arrow type.
        found: String,
    },

    /// A value did not match the declared column type.
    #[error("type mismatch appending to column `{column}`: expected {expected}, got {found}")]
    TypeMismatch {
        /// The column the append was attempted on.
        column: String,
        /// The expected logical type.
        expected: String,
        /// The logical type of the value that was given.
        found: String,
    },

    /// A cast between two types failed for one or more columns.
    #[error("cast failed: {reasons:?}")]
    CastFailed {
        /// Per-column cast failure reasons.
        reasons: Vec<String>,
    },

    /// The underlying Arrow array builder or compute kernel returned an error.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),
}
