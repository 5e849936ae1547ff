// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors raised while building operators from their parsed invocation (§6.1, §7:
//! `invalid_argument`, `invalid_configuration`).

use thiserror::Error;

/// Errors raised while interpreting one operator's `config` value.
#[derive(Debug, Error)]
pub enum Error {
    /// A required argument was missing.
    #[error("operator `{operator}` requires argument `{argument}`")]
    MissingArgument {
        /// The operator being built.
        operator: &'static str,
        /// The missing argument's name.
        argument: &'static str,
    },

    /// An argument's value did not have the expected shape.
    #[error("operator `{operator}` argument `{argument}` is invalid: {message}")]
    InvalidArgument {
        /// The operator being built.
        operator: &'static str,
        /// The offending argument's name.
        argument: &'static str,
        /// A description of the problem.
        message: String,
    },

    /// An aggregation or expression referenced an unknown name.
    #[error("operator `{operator}` references unknown `{name}`")]
    UnknownName {
        /// The operator being built.
        operator: &'static str,
        /// The unresolved name.
        name: String,
    },

    /// A TQL expression in an argument failed to parse.
    #[error(transparent)]
    ExprParse(#[from] tql_df_pipeline::Error),

    /// A value-model error surfaced while building the operator.
    #[error(transparent)]
    Value(#[from] tql_df_value::ValueError),
}

impl From<Error> for tql_df_engine::Error {
    fn from(error: Error) -> Self {
        Self::OperatorError {
            operator: "<build>".to_string(),
            kind: tql_df_engine::OperatorErrorKind::Open,
            message: error.to_string(),
        }
    }
}
