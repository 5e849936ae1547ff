// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Error type for the telemetry crate.

use thiserror::Error;

/// Errors raised while building or emitting metrics batches.
#[derive(Debug, Error)]
pub enum Error {
    /// Building the `tenzir.metrics.operator_buffers` record batch failed.
    #[error("failed to build operator_buffers metrics batch: {0}")]
    ValueError(#[from] tql_df_value::ValueError),
}
