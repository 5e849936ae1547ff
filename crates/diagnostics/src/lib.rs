// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Diagnostic reporting (§3.6, §4.9): a builder for diagnostics, a session/sink abstraction,
//! and a per-pipeline ring buffer exposed through the `diagnostics` aspect source (§6.4).

mod builder;
mod session;

pub use builder::{Diagnostic, DiagnosticBuilder, Location, Severity};
pub use session::{DiagnosticSession, RingBufferSink};
