// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The streaming pipeline runtime (§4.3, §4.5, §4.6): the operator abstraction, a
//! cooperative pull-based scheduler driven on a `tokio` `LocalSet` per pipeline, and the
//! checkpoint protocol.

pub mod checkpoint;
pub mod edge;
pub mod error;
pub mod message;
pub mod operator;
pub mod pipeline;
pub mod stop;

pub use checkpoint::{CheckpointBarrier, CheckpointMarker, StateBlob};
pub use edge::{stage_edge, BufferSnapshot, BufferStats, StageReceiver, StageSender};
pub use error::{Error, OperatorErrorKind};
pub use message::Message;
pub use operator::{EventOrder, Operator, OperatorContext, OperatorIo, OperatorLocation, OptimizeOutcome, Signature};
pub use pipeline::RuntimePipeline;
pub use stop::StopSignal;
