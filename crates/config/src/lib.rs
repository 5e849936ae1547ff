// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Configuration types for pipelines, operators, and runtime settings.
//!
//! Data model:
//! - a pipeline group hosts pipelines
//!   - a pipeline is an ordered, non-empty sequence of operator definitions
//!     - each operator definition names a plugin (by URN) and carries its own
//!       TQL-derived invocation arguments
//!
//! Unlike a general hyper-graph dataflow config, a pipeline here is a flat chain: operator
//! `i` feeds operator `i + 1` directly. There is no port fan-out at the configuration layer;
//! operators that need multiple logical destinations (e.g. `fork`) express that internally.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub mod error;
pub mod operator;
/// Operator plugin URN parsing and validation.
pub mod operator_urn;
pub mod pipeline;
pub mod settings;

/// The id of a pipeline.
pub type PipelineId = Cow<'static, str>;

/// The id (position-stable name) of an operator instance within a pipeline.
pub type OperatorId = Cow<'static, str>;

/// The URN of an operator plugin.
pub use operator_urn::OperatorUrn;

pub use pipeline::PipelineConfig;
pub use settings::PipelineSettings;

/// A human-readable description of a pipeline or operator.
pub type Description = Cow<'static, str>;

/// Element-type signature flags, used to validate adjacency between operators (§3.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    /// No payload flows on this side of the operator.
    Void,
    /// Operator consumes/produces immutable byte chunks.
    ByteChunk,
    /// Operator consumes/produces columnar record batches.
    RecordBatch,
}

impl ElementType {
    /// Returns whether `self` may be fed into an operator declaring `input` on the
    /// consuming side, per the assignability rule of §3.5.
    #[must_use]
    pub const fn assignable_to(self, input: Self) -> bool {
        matches!(
            (self, input),
            (Self::Void, Self::Void)
                | (Self::ByteChunk, Self::ByteChunk)
                | (Self::RecordBatch, Self::RecordBatch)
        )
    }
}
