// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The buffer-stats registry, 1Hz metrics hook, and HTTP control plane (§4.8, §6.5, §6.6,
//! §10.5).

pub mod collector;
pub mod error;
pub mod http;
pub mod registry;

pub use collector::{ChannelMetricsSink, MetricsCollector, MetricsSink, DEFAULT_POLL_INTERVAL, OPERATOR_BUFFERS_SCHEMA_NAME};
pub use error::Error;
pub use http::{router, AppState};
pub use registry::{BufferStatsRegistry, PipelineBufferSnapshot};
