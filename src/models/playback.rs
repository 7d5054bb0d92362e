use serde::{Deserialize, Serialize};

use super::TranscriptionQuality;

/// A segment positioned on the session timeline for playback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSegment {
    /// Seconds from the start of the first segment.
    pub start_time: f64,
    pub end_time: f64,
    pub transcription: String,
    pub translation: String,
    pub confidence: f64,
    pub language: String,
    pub quality: TranscriptionQuality,
}
