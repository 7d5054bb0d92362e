use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::events::SessionEvent;
use crate::models::{PartialResult, Segment, SessionPhase};
use crate::translation::TranslationDispatcher;

use super::config::SegmentationConfig;
use super::extractor::extract_segment;
use super::signals::{evaluate, BoundarySignal, Trigger};
use super::state::SegmentationState;
use super::store::SegmentStore;
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

/// Live segmentation for one session.
///
/// Every entry point takes `&mut self`; callers serialize partial results,
/// timer ticks and control calls behind one lock.
pub struct SegmentationEngine {
    config: SegmentationConfig,
    locale: String,
    state: SegmentationState,
    phase: SessionPhase,
    latest: Option<PartialResult>,
    store: SegmentStore,
    dispatcher: TranslationDispatcher,
    events: broadcast::Sender<SessionEvent>,
    segments_cut: usize,
}

impl SegmentationEngine {
    pub fn new(
        config: SegmentationConfig,
        locale: impl Into<String>,
        store: SegmentStore,
        dispatcher: TranslationDispatcher,
        events: broadcast::Sender<SessionEvent>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            config,
            locale: locale.into(),
            state: SegmentationState::new(now),
            phase: SessionPhase::Idle,
            latest: None,
            store,
            dispatcher,
            events,
            segments_cut: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn state(&self) -> &SegmentationState {
        &self.state
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn latest(&self) -> Option<&PartialResult> {
        self.latest.as_ref()
    }

    pub fn segments_cut(&self) -> usize {
        self.segments_cut
    }

    /// Feed one partial result. Returns the segment cut because of it, if
    /// any. Ignored unless the session is live.
    pub async fn ingest(&mut self, result: PartialResult) -> Option<Segment> {
        if !self.phase.is_live() {
            log_debug!("[ENGINE] dropping partial while {}", self.phase.as_str());
            return None;
        }

        let now = result.received_at;
        if self.phase == SessionPhase::Idle && !result.full_text.trim().is_empty() {
            self.set_phase(SessionPhase::Accumulating);
        }

        let trigger = self.state.observe_text(result.char_len(), now);
        self.latest = Some(result);
        self.evaluate_at(trigger, now).await
    }

    /// Periodic re-check of the pause fallback and the forced timeout.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Option<Segment> {
        if !self.phase.is_live() {
            return None;
        }
        self.evaluate_at(Trigger::Tick, now).await
    }

    /// When the forced timeout will fire if nothing else cuts first.
    pub fn next_forced_deadline(&self) -> Option<DateTime<Utc>> {
        self.phase
            .is_live()
            .then(|| self.state.last_boundary_at + self.config.max_segment_duration())
    }

    pub fn pause(&mut self) -> bool {
        if !self.phase.is_live() {
            return false;
        }
        self.set_phase(SessionPhase::Paused);
        true
    }

    /// Leave `Paused` with cursor and segment timers intact. The quiet-time
    /// clock restarts so the pause itself does not count as silence.
    pub fn resume(&mut self, now: DateTime<Utc>) -> bool {
        if self.phase != SessionPhase::Paused {
            return false;
        }
        self.state.last_change_at = now;
        let has_text = self
            .latest
            .as_ref()
            .is_some_and(|result| !result.full_text.trim().is_empty());
        self.set_phase(if has_text {
            SessionPhase::Accumulating
        } else {
            SessionPhase::Idle
        });
        true
    }

    /// Enter the terminal phase. Text after the cursor that no rule cut is
    /// left unmaterialized.
    pub fn finish(&mut self) {
        self.set_phase(SessionPhase::Stopped);
    }

    async fn evaluate_at(&mut self, trigger: Trigger, now: DateTime<Utc>) -> Option<Segment> {
        let input = self.state.signal_input(self.latest.as_ref(), now);
        let signal = evaluate(&input, trigger, &self.config)?;
        self.cut(signal, now).await
    }

    async fn cut(&mut self, signal: BoundarySignal, now: DateTime<Utc>) -> Option<Segment> {
        if self.phase == SessionPhase::Idle {
            log_debug!("[ENGINE] {} with no speech yet, resetting timers", signal.as_str());
            self.state.mark_boundary(now);
            return None;
        }

        self.set_phase(SessionPhase::Cutting);

        let min_new_chars = if signal.bypasses_content_gates() {
            1
        } else {
            self.config.min_new_content_chars
        };
        let segment = match self.latest.as_ref() {
            Some(latest) => {
                extract_segment(latest, &mut self.state, &self.locale, now, min_new_chars)
            }
            None => None,
        };

        if let Some(segment) = &segment {
            let previous = self
                .store
                .recent_texts(self.config.translation_context_window)
                .await;
            self.store.append(segment.clone()).await;
            self.dispatcher.dispatch(segment, &previous);
            self.segments_cut += 1;

            log_info!(
                "[ENGINE] {} cut {} chars after {:.1}s",
                signal.as_str(),
                segment.text.chars().count(),
                segment.duration_secs
            );
            let _ = self.events.send(SessionEvent::SegmentAppended {
                segment: segment.clone(),
                signal,
            });
        } else {
            log_debug!("[ENGINE] {} fired on a thin tail", signal.as_str());
        }

        self.state.mark_boundary(now);
        self.set_phase(SessionPhase::Accumulating);
        segment
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase == phase {
            return;
        }
        self.phase = phase;
        let _ = self.events.send(SessionEvent::PhaseChanged { phase });
    }
}
