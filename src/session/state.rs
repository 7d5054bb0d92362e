use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::asr::AsrStream;
use crate::segmentation::SegmentationEngine;

use super::ingest::{SessionClock, SessionWorkers};

/// Everything owned by one started session. Dropped on stop.
pub struct SessionState {
    pub session_id: String,
    pub locale: String,
    pub started_at: DateTime<Utc>,
    pub clock: SessionClock,
    pub engine: Arc<Mutex<SegmentationEngine>>,
    /// Running loops; `None` while paused.
    pub workers: Option<SessionWorkers>,
    /// Recognizer stream held across a pause.
    pub parked_stream: Option<AsrStream>,
}

impl SessionState {
    pub fn new(
        session_id: String,
        locale: String,
        clock: SessionClock,
        engine: Arc<Mutex<SegmentationEngine>>,
    ) -> Self {
        Self {
            session_id,
            locale,
            started_at: clock.now(),
            clock,
            engine,
            workers: None,
            parked_stream: None,
        }
    }
}
