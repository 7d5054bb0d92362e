use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Which detectors may open a boundary on a text change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SegmentationStrategy {
    /// Text-only rules.
    Semantic,
    /// Text rules plus the word-gap acoustic pause detector.
    Hybrid,
}

/// Configuration for live segmentation with tunable thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SegmentationConfig {
    /// Dwell time before any content rule may cut (forced timeout excepted)
    pub min_segment_duration_ms: u64,

    /// Ceiling since the last boundary; cuts regardless of content length
    pub max_segment_duration_ms: u64,

    /// Cumulative transcript length required before content rules fire
    pub min_total_content_chars: usize,

    /// Minimum length of the new tail for a segment to be materialized
    pub min_new_content_chars: usize,

    /// Quiet interval (no text-length change) for the pause fallback
    pub pause_fallback_interval_ms: u64,

    /// Period of the timer that re-checks pause and timeout rules
    pub fallback_check_period_ms: u64,

    /// Word gap treated as an acoustic pause
    pub acoustic_pause_threshold_ms: u64,

    /// Number of previous segments passed to the translator as context
    pub translation_context_window: usize,

    pub strategy: SegmentationStrategy,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_segment_duration_ms: 5_000,
            max_segment_duration_ms: 20_000,
            min_total_content_chars: 100,
            min_new_content_chars: 10,
            pause_fallback_interval_ms: 6_000,
            fallback_check_period_ms: 8_000,
            acoustic_pause_threshold_ms: 800,
            translation_context_window: 3,
            strategy: SegmentationStrategy::Hybrid,
        }
    }
}

impl SegmentationConfig {
    pub fn min_segment_duration(&self) -> Duration {
        Duration::milliseconds(self.min_segment_duration_ms as i64)
    }

    pub fn max_segment_duration(&self) -> Duration {
        Duration::milliseconds(self.max_segment_duration_ms as i64)
    }

    pub fn pause_fallback_interval(&self) -> Duration {
        Duration::milliseconds(self.pause_fallback_interval_ms as i64)
    }

    pub fn fallback_check_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.fallback_check_period_ms.max(1))
    }

    pub fn acoustic_pause_threshold_secs(&self) -> f64 {
        self.acoustic_pause_threshold_ms as f64 / 1000.0
    }
}
