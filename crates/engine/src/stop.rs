// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Cooperative pipeline-wide cancellation (§4.5 Cancellation, §4.6 Stop after checkpoint).
//!
//! A stop is a request, not a kill: every operator in a pipeline shares one [`StopSignal`] and
//! is expected to honor it at its next yield point by draining to the next checkpoint marker
//! and then emitting markers (and `exhausted`) only, rather than pulling further input or
//! producing further data. Any operator may request a stop, not only the scheduler — e.g. `head`
//! requests one once it has collected its row count, since it no longer needs anything further
//! from upstream.

use tokio::sync::watch;

/// A pipeline-wide cooperative stop flag, shared by every operator's [`crate::OperatorContext`].
#[derive(Clone)]
pub struct StopSignal {
    tx: watch::Sender<bool>,
}

impl StopSignal {
    /// Creates a fresh, not-yet-requested signal.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Requests every operator sharing this signal to stop. Idempotent.
    pub fn request(&self) {
        let _ = self.tx.send(true);
    }

    /// Whether a stop has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        *self.tx.subscribe().borrow()
    }

    /// Resolves once a stop has been requested; resolves immediately if one already was.
    pub async fn requested(&self) {
        let mut rx = self.tx.subscribe();
        if *rx.borrow() {
            return;
        }
        let _ = rx.changed().await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unrequested() {
        assert!(!StopSignal::new().is_requested());
    }

    #[tokio::test]
    async fn request_is_observed_by_clones_and_is_idempotent() {
        let signal = StopSignal::new();
        let clone = signal.clone();
        signal.request();
        signal.request();
        assert!(clone.is_requested());
        clone.requested().await;
    }
}
