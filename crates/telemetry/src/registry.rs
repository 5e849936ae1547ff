// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The process-wide buffer-stats registry (§4.8): per-pipeline cells registered by weak
//! reference so that an entry disappears on its own once every edge of that pipeline has been
//! dropped, with no explicit deregistration call required.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tql_df_engine::BufferStats;

/// A single pipeline's registered edges, summed at snapshot time.
#[derive(Default)]
struct PipelineEntry {
    edges: Vec<Weak<BufferStats>>,
}

/// Process-wide registry of per-pipeline buffer-stats cells. Guarded by a mutex; every access
/// is a short insert, lookup, or snapshot (§5).
#[derive(Default)]
pub struct BufferStatsRegistry {
    pipelines: Mutex<HashMap<String, PipelineEntry>>,
}

/// One pipeline's summed buffer stats at the moment of a registry snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineBufferSnapshot {
    /// The pipeline this snapshot belongs to.
    pub pipeline_id: String,
    /// Sum of `bytes` across every still-alive edge registered for this pipeline.
    pub bytes: u64,
    /// Sum of `events` across every still-alive edge registered for this pipeline.
    pub events: u64,
}

impl BufferStatsRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one edge's stats cell under `pipeline_id`, holding only a weak reference.
    pub fn register(&self, pipeline_id: impl Into<String>, stats: &Arc<BufferStats>) {
        let mut pipelines = self.pipelines.lock();
        pipelines
            .entry(pipeline_id.into())
            .or_default()
            .edges
            .push(Arc::downgrade(stats));
    }

    /// Snapshots every pipeline's summed stats, dropping dead weak references and pruning any
    /// pipeline left with no live edges.
    pub fn snapshot(&self) -> Vec<PipelineBufferSnapshot> {
        let mut pipelines = self.pipelines.lock();
        let mut out = Vec::with_capacity(pipelines.len());
        pipelines.retain(|pipeline_id, entry| {
            entry.edges.retain(|weak| weak.strong_count() > 0);
            if entry.edges.is_empty() {
                return false;
            }
            let (mut bytes, mut events) = (0u64, 0u64);
            for edge in &entry.edges {
                if let Some(stats) = edge.upgrade() {
                    let snap = stats.snapshot();
                    bytes += snap.bytes;
                    events += snap.events;
                }
            }
            out.push(PipelineBufferSnapshot {
                pipeline_id: pipeline_id.clone(),
                bytes,
                events,
            });
            true
        });
        out
    }

    /// Number of pipelines currently holding at least one live edge, without pruning.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pipelines.lock().len()
    }

    /// Whether the registry has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipelines.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_multiple_edges_for_one_pipeline() {
        let registry = BufferStatsRegistry::new();
        let a = Arc::new(BufferStats::default());
        let b = Arc::new(BufferStats::default());
        registry.register("p1", &a);
        registry.register("p1", &b);
        let snaps = registry.snapshot();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].pipeline_id, "p1");
    }

    #[test]
    fn drops_pipeline_once_every_edge_is_gone() {
        let registry = BufferStatsRegistry::new();
        {
            let cell = Arc::new(BufferStats::default());
            registry.register("p1", &cell);
            assert_eq!(registry.snapshot().len(), 1);
        }
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn distinguishes_pipelines() {
        let registry = BufferStatsRegistry::new();
        let a = Arc::new(BufferStats::default());
        let b = Arc::new(BufferStats::default());
        registry.register("p1", &a);
        registry.register("p2", &b);
        let snaps = registry.snapshot();
        assert_eq!(snaps.len(), 2);
    }
}
