use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of one segmentation session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    /// Started, waiting for the first non-empty partial result.
    Idle,
    Accumulating,
    /// A boundary fired and the segment is being materialized.
    Cutting,
    Paused,
    /// Terminal for this session instance.
    Stopped,
}

impl Default for SessionPhase {
    fn default() -> Self {
        SessionPhase::Idle
    }
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "Idle",
            SessionPhase::Accumulating => "Accumulating",
            SessionPhase::Cutting => "Cutting",
            SessionPhase::Paused => "Paused",
            SessionPhase::Stopped => "Stopped",
        }
    }

    /// Whether the session owns live timers and an ASR subscription.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            SessionPhase::Idle | SessionPhase::Accumulating | SessionPhase::Cutting
        )
    }
}

/// Summary returned when a session stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub locale: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    /// Segments cut live, before post-session optimization.
    pub live_segment_count: usize,
    pub final_segment_count: usize,
}
