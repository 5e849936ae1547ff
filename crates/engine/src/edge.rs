// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! One link between adjacent operators: a bounded single-threaded channel plus the shared
//! buffer-stats cell the metrics hook polls (§4.8).

use crate::error::Error;
use crate::message::Message;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tql_df_channel::mpsc;

/// A `bytes`/`events` counter for one edge, shared between its sender and receiver halves and
/// registered (by weak reference) with the process-wide buffer-stats registry.
#[derive(Debug, Default)]
pub struct BufferStats {
    bytes: AtomicU64,
    events: AtomicU64,
}

/// A point-in-time read of a [`BufferStats`] cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSnapshot {
    /// Approximate bytes currently buffered on this edge.
    pub bytes: u64,
    /// Approximate event count currently buffered on this edge.
    pub events: u64,
}

impl BufferStats {
    fn record_push(&self, message: &Message) {
        let _ = self.bytes.fetch_add(message.approx_bytes(), Ordering::Relaxed);
        let _ = self.events.fetch_add(message.approx_events(), Ordering::Relaxed);
    }

    fn record_pop(&self, message: &Message) {
        let _ = self.bytes.fetch_sub(message.approx_bytes(), Ordering::Relaxed);
        let _ = self.events.fetch_sub(message.approx_events(), Ordering::Relaxed);
    }

    /// Reads the current counters.
    #[must_use]
    pub fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            bytes: self.bytes.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
        }
    }
}

/// The sending half of a stage edge.
pub struct StageSender {
    inner: mpsc::Sender<Message>,
    stats: Arc<BufferStats>,
    high_water_events: u64,
}

/// The receiving half of a stage edge.
pub struct StageReceiver {
    inner: mpsc::Receiver<Message>,
    stats: Arc<BufferStats>,
    low_water_events: u64,
}

impl StageSender {
    /// Sends `message` downstream, recording it against the shared buffer stats.
    pub async fn send(&self, message: Message) -> Result<(), Error> {
        self.stats.record_push(&message);
        match self.inner.send_async(message).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let description = err.to_string();
                self.stats.record_pop(&err.inner());
                Err(Error::ChannelSendError(description))
            }
        }
    }

    /// Whether this edge has reached its high-water mark (§4.5): the producer should not be
    /// resumed again until the consumer drains below the low-water mark.
    #[must_use]
    pub fn is_above_high_watermark(&self) -> bool {
        self.stats.snapshot().events >= self.high_water_events
    }

    /// A snapshot of this edge's buffer stats, for the metrics hook (§4.8).
    #[must_use]
    pub fn stats(&self) -> Arc<BufferStats> {
        Arc::clone(&self.stats)
    }
}

impl StageReceiver {
    /// Receives the next message, recording its departure against the shared buffer stats.
    pub async fn recv(&self) -> Result<Message, Error> {
        let message = self.inner.recv().await?;
        self.stats.record_pop(&message);
        Ok(message)
    }

    /// Whether this edge has drained below its low-water mark.
    #[must_use]
    pub fn is_below_low_watermark(&self) -> bool {
        self.stats.snapshot().events <= self.low_water_events
    }

    /// A snapshot of this edge's buffer stats, for the metrics hook (§4.8).
    #[must_use]
    pub fn stats(&self) -> Arc<BufferStats> {
        Arc::clone(&self.stats)
    }
}

/// Creates one edge between two adjacent operators: a channel bounded to `capacity` messages,
/// plus a shared stats cell whose high/low water marks follow `watermark_ratio` (default 2:1,
/// §4.5).
#[must_use]
pub fn stage_edge(capacity: usize, watermark_ratio: f64) -> (StageSender, StageReceiver) {
    let (tx, rx) = mpsc::Channel::new(capacity);
    let stats = Arc::new(BufferStats::default());
    let high_water_events = capacity as u64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let low_water_events = (capacity as f64 / watermark_ratio).round() as u64;
    (
        StageSender {
            inner: tx,
            stats: Arc::clone(&stats),
            high_water_events,
        },
        StageReceiver {
            inner: rx,
            stats,
            low_water_events,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_and_recv_update_shared_stats() {
        let (tx, rx) = stage_edge(4, 2.0);
        tx.send(Message::Exhausted).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().is_exhausted(), true);
    }

    #[test]
    fn watermarks_follow_ratio() {
        let (tx, rx) = stage_edge(10, 2.0);
        assert_eq!(tx.high_water_events, 10);
        assert_eq!(rx.low_water_events, 5);
    }
}
