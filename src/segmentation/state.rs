use chrono::{DateTime, Utc};

use crate::models::PartialResult;

use super::signals::{SignalInput, Trigger};

/// Cursor and timers of one live segmentation session.
///
/// Owned by the engine and touched only from its serialized entry points.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationState {
    /// Characters of the cumulative transcript already materialized into
    /// segments. Never decreases.
    pub processed_char_count: usize,
    pub segment_started_at: DateTime<Utc>,
    pub last_text_length: usize,
    pub last_change_at: DateTime<Utc>,
    pub last_boundary_at: DateTime<Utc>,
    /// Consecutive partial results that did not change the text length.
    pub no_change_ticks: u32,
}

impl SegmentationState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            processed_char_count: 0,
            segment_started_at: now,
            last_text_length: 0,
            last_change_at: now,
            last_boundary_at: now,
            no_change_ticks: 0,
        }
    }

    /// Record the length of a new transcript snapshot and report which kind
    /// of evaluation it calls for.
    pub fn observe_text(&mut self, char_len: usize, now: DateTime<Utc>) -> Trigger {
        if char_len != self.last_text_length {
            self.last_text_length = char_len;
            self.last_change_at = now;
            self.no_change_ticks = 0;
            Trigger::TextChanged
        } else {
            self.no_change_ticks = self.no_change_ticks.saturating_add(1);
            Trigger::TextUnchanged
        }
    }

    pub fn signal_input<'a>(
        &self,
        latest: Option<&'a PartialResult>,
        now: DateTime<Utc>,
    ) -> SignalInput<'a> {
        SignalInput {
            text: latest.map(|result| result.full_text.as_str()).unwrap_or(""),
            word_spans: latest.map(|result| result.word_spans.as_slice()).unwrap_or(&[]),
            is_final: latest.map(|result| result.is_final).unwrap_or(false),
            now,
            segment_started_at: self.segment_started_at,
            last_change_at: self.last_change_at,
            last_boundary_at: self.last_boundary_at,
        }
    }

    /// Move the cursor forward; a smaller value is ignored.
    pub fn advance_cursor(&mut self, to: usize) {
        self.processed_char_count = self.processed_char_count.max(to);
    }

    /// Reset the per-segment timers after a boundary fired, whether or not a
    /// segment was produced.
    pub fn mark_boundary(&mut self, now: DateTime<Utc>) {
        self.segment_started_at = now;
        self.last_boundary_at = now;
        self.last_change_at = now;
        self.no_change_ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn observe_text_tracks_changes() {
        let start = Utc::now();
        let mut state = SegmentationState::new(start);

        let later = start + Duration::seconds(1);
        assert_eq!(state.observe_text(12, later), Trigger::TextChanged);
        assert_eq!(state.last_change_at, later);

        let even_later = start + Duration::seconds(2);
        assert_eq!(state.observe_text(12, even_later), Trigger::TextUnchanged);
        assert_eq!(state.observe_text(12, even_later), Trigger::TextUnchanged);
        assert_eq!(state.no_change_ticks, 2);
        assert_eq!(state.last_change_at, later);

        // A shrinking re-estimate is still a change.
        assert_eq!(state.observe_text(9, even_later), Trigger::TextChanged);
        assert_eq!(state.no_change_ticks, 0);
    }

    #[test]
    fn cursor_never_moves_back() {
        let mut state = SegmentationState::new(Utc::now());
        state.advance_cursor(40);
        state.advance_cursor(25);
        assert_eq!(state.processed_char_count, 40);
    }

    #[test]
    fn boundary_resets_timers_but_not_cursor() {
        let start = Utc::now();
        let mut state = SegmentationState::new(start);
        state.advance_cursor(30);
        state.no_change_ticks = 4;

        let cut = start + Duration::seconds(7);
        state.mark_boundary(cut);
        assert_eq!(state.segment_started_at, cut);
        assert_eq!(state.last_boundary_at, cut);
        assert_eq!(state.no_change_ticks, 0);
        assert_eq!(state.processed_char_count, 30);
    }
}
