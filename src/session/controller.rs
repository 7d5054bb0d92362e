use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::asr::{is_supported_locale, AsrError, SpeechRecognizer, DEFAULT_LOCALE};
use crate::events::{SessionEvent, EVENT_CHANNEL_CAPACITY};
use crate::models::{PartialResult, Segment, SessionInfo, SessionPhase};
use crate::segmentation::{
    MergeAdvisor, PostSessionOptimizer, SegmentStore, SegmentationConfig, SegmentationEngine,
};
use crate::translation::{TranslationDispatcher, Translator};

use super::ingest::{discard_buffered, SessionClock, SessionWorkers};
use super::state::SessionState;
use crate::{log_error, log_info};

const ENABLE_LOGS: bool = true;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a session is already active")]
    AlreadyActive,

    #[error("no active session")]
    NotActive,

    #[error("session is not paused")]
    NotPaused,

    #[error("unsupported locale '{0}'")]
    UnsupportedLocale(String),

    #[error(transparent)]
    Asr(#[from] AsrError),
}

/// Owns the recognizer subscription and the segmentation engine of the
/// current session.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SegmentationController {
    recognizer: Arc<dyn SpeechRecognizer>,
    optimizer: PostSessionOptimizer,
    dispatcher: TranslationDispatcher,
    translator: Arc<dyn Translator>,
    config: SegmentationConfig,
    store: SegmentStore,
    events: broadcast::Sender<SessionEvent>,
    locale: Arc<Mutex<String>>,
    session: Arc<Mutex<Option<SessionState>>>,
}

impl SegmentationController {
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        translator: Arc<dyn Translator>,
        advisor: Arc<dyn MergeAdvisor>,
        config: SegmentationConfig,
    ) -> Self {
        let store = SegmentStore::new();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let dispatcher =
            TranslationDispatcher::new(Arc::clone(&translator), store.clone(), None, events.clone());

        Self {
            recognizer,
            optimizer: PostSessionOptimizer::new(advisor),
            dispatcher,
            translator,
            config,
            store,
            events,
            locale: Arc::new(Mutex::new(DEFAULT_LOCALE.to_string())),
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// Translate every segment into `target_language` instead of flipping
    /// between Chinese and English.
    pub fn with_target_language(mut self, target_language: Option<String>) -> Self {
        self.dispatcher = TranslationDispatcher::new(
            Arc::clone(&self.translator),
            self.store.clone(),
            target_language,
            self.events.clone(),
        );
        self
    }

    pub fn with_locale(self, locale: impl Into<String>) -> Self {
        Self {
            locale: Arc::new(Mutex::new(locale.into())),
            ..self
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn locale(&self) -> String {
        self.locale.lock().await.clone()
    }

    /// Phase of the current session, `None` when no session exists.
    pub async fn phase(&self) -> Option<SessionPhase> {
        let engine = self.engine().await?;
        let phase = engine.lock().await.phase();
        Some(phase)
    }

    pub async fn is_active(&self) -> bool {
        self.session.lock().await.is_some()
    }

    pub async fn start(&self) -> Result<String, SessionError> {
        let mut guard = self.session.lock().await;
        if guard.is_some() {
            return Err(SessionError::AlreadyActive);
        }

        let locale = self.locale.lock().await.clone();
        if !is_supported_locale(&locale) {
            return Err(SessionError::UnsupportedLocale(locale));
        }

        let stream = self.recognizer.start(&locale).await.map_err(|e| {
            log_error!("recognizer failed to start: {}", e);
            e
        })?;

        self.store.clear().await;

        let clock = SessionClock::new();
        let session_id = Uuid::new_v4().to_string();
        let engine = Arc::new(Mutex::new(SegmentationEngine::new(
            self.config.clone(),
            locale.clone(),
            self.store.clone(),
            self.dispatcher.clone(),
            self.events.clone(),
            clock.now(),
        )));

        let mut state = SessionState::new(session_id.clone(), locale, clock, Arc::clone(&engine));
        state.workers = Some(SessionWorkers::spawn(
            engine,
            Some(stream),
            self.events.clone(),
            self.config.fallback_check_period(),
            clock,
        ));
        log_info!("session {} started ({})", session_id, state.locale);
        *guard = Some(state);

        let _ = self.events.send(SessionEvent::PhaseChanged {
            phase: SessionPhase::Idle,
        });
        Ok(session_id)
    }

    /// Stop the session and run the merge pass. A no-op without a session.
    pub async fn stop(&self) -> Option<SessionInfo> {
        let mut guard = self.session.lock().await;
        let mut state = guard.take()?;

        if let Some(workers) = state.workers.take() {
            workers.shutdown().await;
        }
        state.parked_stream = None;
        self.recognizer.stop().await;

        let live_segment_count = {
            let mut engine = state.engine.lock().await;
            engine.finish();
            engine.segments_cut()
        };
        let stopped_at = state.clock.now();

        let snapshot = self.store.snapshot().await;
        let before = snapshot.len();
        let optimized = self.optimizer.optimize(snapshot).await;
        let after = optimized.len();
        if after != before {
            self.store.replace(optimized).await;
        }
        let _ = self.events.send(SessionEvent::Optimized { before, after });

        log_info!(
            "session {} stopped: {} live segments, {} after merge",
            state.session_id,
            live_segment_count,
            after
        );

        Some(SessionInfo {
            id: state.session_id,
            locale: state.locale,
            started_at: state.started_at,
            stopped_at,
            live_segment_count,
            final_segment_count: after,
        })
    }

    /// Suspend timers, ingest and audio capture. State is kept.
    pub async fn pause(&self) -> Result<(), SessionError> {
        let mut guard = self.session.lock().await;
        let state = guard.as_mut().ok_or(SessionError::NotActive)?;

        if !state.engine.lock().await.pause() {
            return Ok(());
        }
        if let Some(workers) = state.workers.take() {
            state.parked_stream = workers.shutdown().await;
        }
        self.recognizer.pause().await;
        log_info!("session {} paused", state.session_id);
        Ok(())
    }

    pub async fn resume(&self) -> Result<(), SessionError> {
        let mut guard = self.session.lock().await;
        let state = guard.as_mut().ok_or(SessionError::NotActive)?;

        if state.engine.lock().await.phase() != SessionPhase::Paused {
            return Err(SessionError::NotPaused);
        }
        self.recognizer.resume().await?;

        let mut stream = None;
        if let Some(parked) = state.parked_stream.take() {
            let (dropped, open) = discard_buffered(parked);
            if dropped > 0 {
                log_info!("dropped {} recognizer events queued during pause", dropped);
            }
            if open.is_none() {
                let _ = self.events.send(SessionEvent::InputClosed);
            }
            stream = open;
        }

        state.engine.lock().await.resume(state.clock.now());
        state.workers = Some(SessionWorkers::spawn(
            Arc::clone(&state.engine),
            stream,
            self.events.clone(),
            self.config.fallback_check_period(),
            state.clock,
        ));
        log_info!("session {} resumed", state.session_id);
        Ok(())
    }

    /// Change the recognizer locale. A running session is stopped and a new
    /// one started with the new locale.
    pub async fn switch_language(&self, locale: &str) -> Result<(), SessionError> {
        if !is_supported_locale(locale) {
            return Err(SessionError::UnsupportedLocale(locale.to_string()));
        }

        let was_active = self.is_active().await;
        if was_active {
            self.stop().await;
        }
        *self.locale.lock().await = locale.to_string();
        log_info!("recognizer locale set to {}", locale);

        if was_active {
            self.start().await?;
        }
        Ok(())
    }

    /// Feed a partial result directly, bypassing the recognizer stream.
    pub async fn ingest(&self, result: PartialResult) -> Result<Option<Segment>, SessionError> {
        let engine = self.engine().await.ok_or(SessionError::NotActive)?;
        let segment = engine.lock().await.ingest(result).await;
        Ok(segment)
    }

    /// Run the timer-driven checks as of `now`.
    pub async fn check_boundaries_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<Segment>, SessionError> {
        let engine = self.engine().await.ok_or(SessionError::NotActive)?;
        let segment = engine.lock().await.tick(now).await;
        Ok(segment)
    }

    pub async fn segments(&self) -> Vec<Segment> {
        self.store.snapshot().await
    }

    /// Wait for every translation job dispatched so far.
    pub async fn drain_translations(&self) {
        self.dispatcher.drain().await;
    }

    async fn engine(&self) -> Option<Arc<Mutex<SegmentationEngine>>> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|state| Arc::clone(&state.engine))
    }
}
