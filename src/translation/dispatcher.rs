use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio_util::task::TaskTracker;

use crate::events::SessionEvent;
use crate::models::Segment;
use crate::segmentation::SegmentStore;

use super::language::{build_context, detect_language, target_language_for};
use super::{TranslationRequest, Translator};
use crate::{log_debug, log_warn};

const ENABLE_LOGS: bool = true;

/// Fires one translation job per appended segment and writes the result back
/// into the store by segment id.
///
/// Jobs never block segmentation; a failing or slow job only affects the
/// translation field of its own segment.
#[derive(Clone)]
pub struct TranslationDispatcher {
    translator: Arc<dyn Translator>,
    store: SegmentStore,
    target_language: Option<String>,
    tracker: TaskTracker,
    /// Held for the whole close/wait/reopen cycle so overlapping drains
    /// never reopen the tracker under each other.
    draining: Arc<Mutex<()>>,
    events: broadcast::Sender<SessionEvent>,
}

impl TranslationDispatcher {
    pub fn new(
        translator: Arc<dyn Translator>,
        store: SegmentStore,
        target_language: Option<String>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            translator,
            store,
            target_language,
            tracker: TaskTracker::new(),
            draining: Arc::new(Mutex::new(())),
            events,
        }
    }

    pub fn request_for(&self, segment: &Segment, previous_texts: &[String]) -> TranslationRequest {
        let source_language = detect_language(&segment.text);
        let target_language = self
            .target_language
            .clone()
            .unwrap_or_else(|| target_language_for(source_language).to_string());

        TranslationRequest {
            text: segment.text.clone(),
            source_language: source_language.to_string(),
            target_language,
            context: build_context(previous_texts),
        }
    }

    /// Spawn the translation job for `segment`. `previous_texts` are the
    /// segments appended before it, oldest first.
    pub fn dispatch(&self, segment: &Segment, previous_texts: &[String]) {
        let request = self.request_for(segment, previous_texts);
        let segment_id = segment.id.clone();
        let translator = Arc::clone(&self.translator);
        let store = self.store.clone();
        let events = self.events.clone();

        self.tracker.spawn(async move {
            let (translation, failed) = match translator.translate(&request).await {
                Ok(translation) => (translation, false),
                Err(e) => {
                    log_warn!("[TRANSLATE] segment {} failed: {}", segment_id, e);
                    (format!("Translation error: {}", e), true)
                }
            };

            if !store.patch_translation(&segment_id, translation.clone()).await {
                log_debug!("[TRANSLATE] segment {} no longer in store", segment_id);
                return;
            }

            let _ = events.send(SessionEvent::TranslationUpdated {
                segment_id,
                translation,
                failed,
            });
        });
    }

    /// Jobs spawned and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every job spawned so far. Jobs dispatched while a drain is
    /// running are waited for as well. New jobs may be dispatched afterwards.
    pub async fn drain(&self) {
        let _draining = self.draining.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
