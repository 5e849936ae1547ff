// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the pipeline engine.
//!
//! Important note: it is important not to use `!Send` data types in errors (e.g. avoid using
//! `Rc`) so these errors can cross a `spawn_local` join boundary.

use std::fmt;

/// High-level classification for operator failures, to aid troubleshooting.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OperatorErrorKind {
    /// Failure during the open phase, before the operator entered its data loop.
    Open,
    /// A runtime type clash detected during composition (§4.4).
    TypeClash,
    /// Failure transporting or transforming messages once the data loop started.
    Transport,
    /// Failure raised while shutting the operator down.
    Shutdown,
    /// Catch-all for failures that do not fit another category.
    Other,
}

impl fmt::Display for OperatorErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Open => "open",
            Self::TypeClash => "type_clash",
            Self::Transport => "transport",
            Self::Shutdown => "shutdown",
            Self::Other => "other",
        };
        write!(f, "{label}")
    }
}

/// All errors that can occur in the pipeline runtime.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A wrapper for the config errors.
    #[error("a config error occurred: {0}")]
    ConfigError(#[from] tql_df_config::error::Error),

    /// A wrapper for the value-model errors.
    #[error("a value error occurred: {0}")]
    ValueError(#[from] tql_df_value::ValueError),

    /// A wrapper for the channel receive errors.
    #[error("a channel error occurred: {0}")]
    ChannelRecvError(#[from] tql_df_channel::error::RecvError),

    /// A wrapper for the channel send errors; the payload is dropped since `Message` may
    /// carry `!Send` Arrow arrays across the generic boundary.
    #[error("a channel send error occurred: {0}")]
    ChannelSendError(String),

    /// An operator detected a type clash between its input and what it can accept.
    #[error("type clash in operator `{operator}`: {message}")]
    TypeClash {
        /// The operator at which composition failed.
        operator: String,
        /// A description of the mismatch.
        message: String,
    },

    /// A wrapper for an operator failure.
    #[error("operator `{operator}` failed ({kind}): {message}")]
    OperatorError {
        /// The operator that failed.
        operator: String,
        /// High-level classification of the failure.
        kind: OperatorErrorKind,
        /// The error message.
        message: String,
    },

    /// An operator did not yield within its configured stall timeout (§4.5).
    #[error("operator `{operator}` stalled: no yield for {elapsed_secs}s (limit {limit_secs}s)")]
    StallTimeout {
        /// The operator that stalled.
        operator: String,
        /// How long the operator went without yielding.
        elapsed_secs: u64,
        /// The configured stall timeout.
        limit_secs: u64,
    },

    /// A spawned operator task panicked or was cancelled.
    #[error("operator task join error: {message} (cancelled: {is_cancelled}, panicked: {is_panic})")]
    JoinTaskError {
        /// Whether the task was cancelled.
        is_cancelled: bool,
        /// Whether the task panicked.
        is_panic: bool,
        /// The error message.
        message: String,
    },

    /// The pipeline being run has no operators.
    #[error("pipeline has no operators to run")]
    EmptyPipeline,

    /// An internal error that should not be reachable in correct configurations.
    #[error("internal error: {message}")]
    InternalError {
        /// An internal error message.
        message: String,
    },
}

impl<T> From<tql_df_channel::error::SendError<T>> for Error {
    fn from(error: tql_df_channel::error::SendError<T>) -> Self {
        Self::ChannelSendError(error.to_string())
    }
}
