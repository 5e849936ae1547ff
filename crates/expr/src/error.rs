// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the expr crate.

/// Errors that can occur while evaluating an expression or looking up a function.
#[derive(thiserror::Error, Debug)]
pub enum ExprError {
    /// No function or aggregation is registered under this name.
    #[error("unknown function `{name}`")]
    UnknownFunction {
        /// The function name that was looked up.
        name: String,
    },

    /// A function was called with the wrong number of arguments.
    #[error("function `{name}` expected {expected} argument(s), got {found}")]
    ArityMismatch {
        /// The function name.
        name: String,
        /// Expected argument count.
        expected: usize,
        /// Argument count actually given.
        found: usize,
    },

    /// An argument's runtime type did not match what the function requires.
    #[error("function `{name}`: argument {index} has wrong type: {message}")]
    ArgumentType {
        /// The function name.
        name: String,
        /// The zero-based argument index.
        index: usize,
        /// A description of the mismatch.
        message: String,
    },

    /// The underlying value model returned an error (e.g. while building a series).
    #[error(transparent)]
    Value(#[from] tql_df_value::ValueError),
}
