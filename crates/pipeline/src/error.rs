// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for parsing and composing TQL pipelines.

use thiserror::Error;

/// Errors raised while parsing or composing a pipeline (§7: `parse_error`, `type_clash`,
/// `lookup_error`).
#[derive(Debug, Error)]
pub enum Error {
    /// The TQL source did not match the grammar.
    #[error("failed to parse pipeline: {0}")]
    ParseError(String),

    /// An operator name has no registered plugin.
    #[error("unknown operator `{name}`")]
    UnknownOperator {
        /// The unresolved operator name.
        name: String,
    },

    /// An operator's own argument parser rejected its invocation.
    #[error("operator `{operator}` rejected its arguments: {message}")]
    InvalidArgument {
        /// The operator that rejected its arguments.
        operator: String,
        /// The rejection reason.
        message: String,
    },

    /// Two adjacent operators declare incompatible element types (§3.5).
    #[error("type clash between `{upstream}` (outputs {upstream_output:?}) and `{downstream}` (expects {downstream_input:?})")]
    TypeClash {
        /// The upstream operator.
        upstream: String,
        /// The upstream operator's declared output element type.
        upstream_output: tql_df_config::ElementType,
        /// The downstream operator.
        downstream: String,
        /// The downstream operator's declared input element type.
        downstream_input: tql_df_config::ElementType,
    },

    /// A pipeline was composed with no operators.
    #[error("pipeline has no operators")]
    EmptyPipeline,

    /// The underlying operator failed to build from its config.
    #[error(transparent)]
    Engine(#[from] tql_df_engine::Error),

    /// Config-layer error surfaced through the composer.
    #[error(transparent)]
    Config(#[from] tql_df_config::error::Error),
}
