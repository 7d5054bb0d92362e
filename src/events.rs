use serde::Serialize;

use crate::models::{Segment, SessionPhase};
use crate::segmentation::BoundarySignal;

/// Broadcast buffer; slow subscribers see `RecvError::Lagged` rather than
/// holding back the ingest path.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events published while a session runs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum SessionEvent {
    PhaseChanged {
        phase: SessionPhase,
    },
    SegmentAppended {
        segment: Segment,
        signal: BoundarySignal,
    },
    /// A translation job finished; `failed` marks an error string patch.
    TranslationUpdated {
        segment_id: String,
        translation: String,
        failed: bool,
    },
    /// Recognizer error reported mid-session. The session keeps running.
    AsrError {
        message: String,
    },
    /// The recognizer closed its result stream.
    InputClosed,
    Optimized {
        before: usize,
        after: usize,
    },
}
