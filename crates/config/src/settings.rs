// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Pipeline-wide runtime settings (§10.3).
//!
//! These are the knobs named throughout the design: default batch row cap, default channel
//! buffer size, the high/low watermark ratio used for backpressure, the stall-detection
//! timeout, a per-pipeline memory budget, and the checkpoint interval. All default values match
//! the defaults named in the component design sections.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default target number of rows per finished record batch (§4.1).
pub const DEFAULT_BATCH_ROW_CAP: usize = 64 * 1024;

/// Default bounded channel capacity between adjacent operators.
pub const DEFAULT_CHANNEL_BUFFER_SIZE: usize = 64;

/// Default ratio between the high-water-mark and low-water-mark used for backpressure (§4.5).
pub const DEFAULT_WATERMARK_RATIO: f64 = 2.0;

/// Default stall-detection threshold: how long an operator may go without yielding anything,
/// including keepalives, before the runtime raises a stall diagnostic (§4.5, §9).
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default checkpoint interval (time-based boundary, §4.6).
pub const DEFAULT_CHECKPOINT_INTERVAL: Duration = Duration::from_secs(30);

/// Pipeline-wide runtime knobs, serde-deserializable from a TOML/YAML config file or
/// overridable via CLI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct PipelineSettings {
    /// Target number of rows per finished record batch.
    pub batch_row_cap: usize,

    /// Bounded channel capacity between adjacent operators.
    pub channel_buffer_size: usize,

    /// High-water-mark / low-water-mark ratio used for backpressure.
    pub watermark_ratio: f64,

    /// Maximum idle duration before the runtime raises a stall diagnostic.
    #[serde(with = "humantime_serde")]
    pub stall_timeout: Duration,

    /// Interval at which the runtime injects a time-based checkpoint marker.
    #[serde(with = "humantime_serde")]
    pub checkpoint_interval: Duration,

    /// Optional soft memory budget for this pipeline, in bytes. `None` means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_budget_bytes: Option<u64>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_row_cap: DEFAULT_BATCH_ROW_CAP,
            channel_buffer_size: DEFAULT_CHANNEL_BUFFER_SIZE,
            watermark_ratio: DEFAULT_WATERMARK_RATIO,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            memory_budget_bytes: None,
        }
    }
}

impl PipelineSettings {
    /// Returns the low-water-mark for a given high-water-mark, using `watermark_ratio`.
    #[must_use]
    pub fn low_water_mark(&self, high_water_mark: usize) -> usize {
        if self.watermark_ratio <= 0.0 {
            return high_water_mark;
        }
        ((high_water_mark as f64) / self.watermark_ratio).floor() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_design_values() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.batch_row_cap, 65536);
        assert_eq!(settings.stall_timeout, Duration::from_secs(5));
        assert_eq!(settings.checkpoint_interval, Duration::from_secs(30));
        assert!(settings.memory_budget_bytes.is_none());
    }

    #[test]
    fn low_water_mark_uses_ratio() {
        let settings = PipelineSettings {
            watermark_ratio: 2.0,
            ..PipelineSettings::default()
        };
        assert_eq!(settings.low_water_mark(100), 50);
    }

    #[test]
    fn deserializes_partial_overrides_from_yaml() {
        let yaml = "batch_row_cap: 1000\nstall_timeout: 10s\n";
        let settings: PipelineSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.batch_row_cap, 1000);
        assert_eq!(settings.stall_timeout, Duration::from_secs(10));
        assert_eq!(settings.channel_buffer_size, DEFAULT_CHANNEL_BUFFER_SIZE);
    }
}
