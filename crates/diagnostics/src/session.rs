// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! A diagnostic session holds a sink; the sink here is a ring buffer per pipeline (§4.9),
//! exposed through the `diagnostics` aspect source (§6.4). Duplicate diagnostics with
//! identical text and location are coalesced within a dedup window.

use crate::builder::Diagnostic;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default dedup window: diagnostics with the same text and location within this interval
/// are coalesced rather than duplicated in the ring buffer.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(1);

/// A fixed-capacity ring buffer of diagnostics plus a dedup window, guarded by a mutex since
/// diagnostics may be emitted from any operator in the pipeline.
pub struct RingBufferSink {
    capacity: usize,
    buffer: Mutex<VecDeque<Diagnostic>>,
    last_seen: Mutex<HashMap<String, Instant>>,
    dedup_window: Duration,
}

impl RingBufferSink {
    /// Creates a new ring buffer sink with the given capacity and the default dedup window.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            last_seen: Mutex::new(HashMap::new()),
            dedup_window: DEFAULT_DEDUP_WINDOW,
        }
    }

    /// Pushes `diagnostic`, coalescing it away if an identical diagnostic was pushed within
    /// the dedup window. Returns whether the diagnostic was newly recorded.
    pub fn push(&self, diagnostic: Diagnostic) -> bool {
        let key = diagnostic.dedup_key();
        let now = Instant::now();
        {
            let mut last_seen = self.last_seen.lock();
            if let Some(previous) = last_seen.get(&key) {
                if now.duration_since(*previous) < self.dedup_window {
                    return false;
                }
            }
            let _ = last_seen.insert(key, now);
        }
        let mut buffer = self.buffer.lock();
        if buffer.len() == self.capacity {
            let _ = buffer.pop_front();
        }
        buffer.push_back(diagnostic);
        true
    }

    /// Returns a snapshot of all currently buffered diagnostics, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.buffer.lock().iter().cloned().collect()
    }
}

/// A session bound to one pipeline, forwarding emitted diagnostics into a shared sink.
#[derive(Clone)]
pub struct DiagnosticSession {
    pipeline_id: Arc<str>,
    sink: Arc<RingBufferSink>,
}

impl DiagnosticSession {
    /// Creates a session for `pipeline_id` with its own ring buffer of the given capacity.
    #[must_use]
    pub fn new(pipeline_id: impl Into<Arc<str>>, capacity: usize) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            sink: Arc::new(RingBufferSink::new(capacity)),
        }
    }

    /// Creates a session for `pipeline_id` backed by an existing shared sink (e.g. one
    /// registered with a process-wide diagnostics aspect source).
    #[must_use]
    pub fn with_sink(pipeline_id: impl Into<Arc<str>>, sink: Arc<RingBufferSink>) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            sink,
        }
    }

    /// Returns the id of the pipeline this session reports for.
    #[must_use]
    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    /// Emits `diagnostic` into the session's sink, logging at a level matching its severity.
    pub fn emit(&self, diagnostic: Diagnostic) {
        let recorded = self.sink.push(diagnostic.clone());
        if !recorded {
            return;
        }
        match diagnostic.severity {
            crate::builder::Severity::Error => {
                tracing::error!(pipeline = %self.pipeline_id, message = %diagnostic.message, "diagnostic");
            }
            crate::builder::Severity::Warning => {
                tracing::warn!(pipeline = %self.pipeline_id, message = %diagnostic.message, "diagnostic");
            }
            crate::builder::Severity::Note => {
                tracing::info!(pipeline = %self.pipeline_id, message = %diagnostic.message, "diagnostic");
            }
        }
    }

    /// Returns a snapshot of all buffered diagnostics for this session's sink.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.sink.snapshot()
    }

    /// Returns the shared sink, e.g. to register it with the `diagnostics` aspect source.
    #[must_use]
    pub fn sink(&self) -> Arc<RingBufferSink> {
        Arc::clone(&self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Diagnostic;

    #[test]
    fn ring_buffer_evicts_oldest_at_capacity() {
        let sink = RingBufferSink::new(2);
        assert!(sink.push(mk_diag("a")));
        assert!(sink.push(mk_diag("b")));
        assert!(sink.push(mk_diag("c")));
        let snapshot = sink.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].message, "b");
        assert_eq!(snapshot[1].message, "c");
    }

    #[test]
    fn dedup_window_coalesces_identical_diagnostics() {
        let sink = RingBufferSink::new(16);
        assert!(sink.push(mk_diag("dup")));
        assert!(!sink.push(mk_diag("dup")));
        assert_eq!(sink.snapshot().len(), 1);
    }

    fn mk_diag(message: &str) -> Diagnostic {
        Diagnostic {
            severity: crate::builder::Severity::Error,
            message: message.to_string(),
            location: None,
            annotations: Vec::new(),
            docs: None,
        }
    }
}
