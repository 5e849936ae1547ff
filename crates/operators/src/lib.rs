// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Concrete pipeline operators (§4.7): sources, transformations, sinks, and aspect sources,
//! plus the [`registry`] wiring every builtin into a [`tql_df_pipeline::OperatorRegistry`].

pub mod assert_throughput_op;
pub mod cast_op;
pub mod diagnostics_op;
pub mod error;
pub mod flatten_op;
pub mod fork_op;
pub mod from_op;
pub mod head_tail;
pub mod json;
pub mod metrics_op;
pub mod partitions_op;
pub mod plugins_op;
pub mod registry;
pub mod repeat_op;
pub mod schema_catalog;
pub mod schemas_op;
pub mod select_op;
pub mod summarize_op;
pub mod unordered_op;
pub mod where_op;

pub use error::Error;
pub use registry::{builtin_registry, buffer_stats_registry};
