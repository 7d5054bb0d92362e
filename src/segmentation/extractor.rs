use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{PartialResult, Segment};

use super::state::SegmentationState;

/// The not-yet-materialized tail of `full_text`, trimmed.
///
/// The cursor counts characters; a cursor past the end (the recognizer
/// shortened its hypothesis) yields an empty tail.
pub fn new_content(full_text: &str, processed_char_count: usize) -> String {
    full_text
        .chars()
        .skip(processed_char_count)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Materialize the tail of `latest` into a segment.
///
/// Returns `None` when the tail is shorter than `min_new_chars`; the cursor
/// is left where it was so the text stays available for the next cut. On
/// success the cursor moves to the end of the transcript.
pub fn extract_segment(
    latest: &PartialResult,
    state: &mut SegmentationState,
    language: &str,
    now: DateTime<Utc>,
    min_new_chars: usize,
) -> Option<Segment> {
    let text = new_content(&latest.full_text, state.processed_char_count);
    let text_len = text.chars().count();
    if text_len == 0 || text_len < min_new_chars {
        return None;
    }

    let duration_ms = (now - state.segment_started_at).num_milliseconds().max(0);

    let segment = Segment {
        id: Uuid::new_v4().to_string(),
        text,
        started_at: state.segment_started_at,
        duration_secs: duration_ms as f64 / 1000.0,
        confidence: latest.average_confidence().unwrap_or(0.0),
        language: language.to_string(),
        quality: latest.quality(),
        translation: String::new(),
    };

    state.advance_cursor(latest.char_len());
    Some(segment)
}
