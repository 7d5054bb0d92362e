//! A recognizer that replays a fixed list of events.
//!
//! Used by the replay binary and by tests in place of a live engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{is_supported_locale, AsrError, AsrEvent, AsrStream, SpeechRecognizer};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Deliver everything immediately with the recorded timestamps.
    Immediate,
    /// Sleep for the recorded gaps and restamp results with the wall clock.
    Realtime,
}

/// Call counters, shared so tests can observe them after handing the
/// recognizer to a controller.
#[derive(Debug, Default)]
pub struct RecognizerStats {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub pauses: AtomicUsize,
    pub resumes: AtomicUsize,
}

impl RecognizerStats {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }
}

pub struct ScriptedRecognizer {
    script: Vec<AsrEvent>,
    pacing: Pacing,
    start_error: Option<AsrError>,
    hold_open: bool,
    stats: Arc<RecognizerStats>,
    feeder: Mutex<Option<CancellationToken>>,
}

impl ScriptedRecognizer {
    pub fn new(script: Vec<AsrEvent>) -> Self {
        Self {
            script,
            pacing: Pacing::Immediate,
            start_error: None,
            hold_open: false,
            stats: Arc::new(RecognizerStats::default()),
            feeder: Mutex::new(None),
        }
    }

    /// A recognizer that emits nothing and keeps its stream open until stopped.
    pub fn silent() -> Self {
        Self::new(Vec::new()).hold_open()
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Make `start` fail, as a recognizer without permission would.
    pub fn failing(mut self, error: AsrError) -> Self {
        self.start_error = Some(error);
        self
    }

    /// Keep the stream open after the script runs out.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn stats(&self) -> Arc<RecognizerStats> {
        Arc::clone(&self.stats)
    }

    fn replace_feeder(&self, token: Option<CancellationToken>) {
        let mut guard = match self.feeder.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = guard.take() {
            previous.cancel();
        }
        *guard = token;
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn start(&self, locale: &str) -> Result<AsrStream, AsrError> {
        if let Some(error) = &self.start_error {
            return Err(error.clone());
        }
        if !is_supported_locale(locale) {
            return Err(AsrError::UnsupportedLocale(locale.to_string()));
        }

        self.stats.starts.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let token = CancellationToken::new();
        self.replace_feeder(Some(token.clone()));

        let script = self.script.clone();
        let pacing = self.pacing;
        let hold_open = self.hold_open;

        tokio::spawn(async move {
            tokio::select! {
                _ = feed(script, pacing, &tx) => {
                    if hold_open {
                        token.cancelled().await;
                    }
                }
                _ = token.cancelled() => {}
            }
            debug!("scripted recognizer feeder finished");
        });

        Ok(rx)
    }

    async fn stop(&self) {
        self.stats.stops.fetch_add(1, Ordering::SeqCst);
        self.replace_feeder(None);
    }

    async fn pause(&self) {
        self.stats.pauses.fetch_add(1, Ordering::SeqCst);
    }

    async fn resume(&self) -> Result<(), AsrError> {
        self.stats.resumes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

async fn feed(script: Vec<AsrEvent>, pacing: Pacing, tx: &mpsc::Sender<AsrEvent>) {
    let mut previous_at: Option<DateTime<Utc>> = None;

    for event in script {
        let event = match (pacing, event) {
            (Pacing::Realtime, AsrEvent::Partial(mut result)) => {
                if let Some(previous) = previous_at {
                    let gap = (result.received_at - previous)
                        .to_std()
                        .unwrap_or_default();
                    tokio::time::sleep(gap).await;
                }
                previous_at = Some(result.received_at);
                result.received_at = Utc::now();
                AsrEvent::Partial(result)
            }
            (_, event) => event,
        };

        if tx.send(event).await.is_err() {
            return;
        }
    }
}
