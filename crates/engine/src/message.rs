// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Messages that flow between operators (§4.3, §4.6): `record_batch`, `byte_chunk`,
//! `checkpoint_marker`, and `exhausted`. Checkpoint markers flow in-band with data.

use crate::checkpoint::CheckpointMarker;
use tql_df_value::RecordBatch;

/// A message traversing one edge of a pipeline.
#[derive(Debug, Clone)]
pub enum Message {
    /// A columnar batch of events.
    RecordBatch(RecordBatch),

    /// A chunk of undecoded bytes, produced by sources ahead of parsing.
    ByteChunk(Vec<u8>),

    /// A checkpoint marker injected by the runtime at a source and forwarded in-band.
    CheckpointMarker(CheckpointMarker),

    /// Signals that the upstream side has no more data; terminal for this edge.
    Exhausted,
}

impl Message {
    /// Whether this message carries payload data (as opposed to a marker or `exhausted`).
    #[must_use]
    pub const fn is_data(&self) -> bool {
        matches!(self, Self::RecordBatch(_) | Self::ByteChunk(_))
    }

    /// Whether this is a checkpoint marker.
    #[must_use]
    pub const fn is_checkpoint_marker(&self) -> bool {
        matches!(self, Self::CheckpointMarker(_))
    }

    /// Whether this is the terminal `exhausted` message.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    /// A rough size estimate in bytes, used only for buffer-stats accounting (§4.8); not an
    /// exact memory accounting.
    #[must_use]
    pub fn approx_bytes(&self) -> u64 {
        match self {
            Self::RecordBatch(batch) => batch.arrow().get_array_memory_size() as u64,
            Self::ByteChunk(bytes) => bytes.len() as u64,
            Self::CheckpointMarker(_) | Self::Exhausted => 0,
        }
    }

    /// The number of events this message represents, used for buffer-stats accounting.
    #[must_use]
    pub fn approx_events(&self) -> u64 {
        match self {
            Self::RecordBatch(batch) => batch.rows() as u64,
            Self::ByteChunk(_) | Self::CheckpointMarker(_) | Self::Exhausted => 0,
        }
    }
}
