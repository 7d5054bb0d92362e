//! Speech recognizer boundary.
//!
//! The recognizer delivers whole-utterance hypotheses on its own task; the
//! session only sees the receiving end of the channel.

pub mod scripted;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::models::PartialResult;

pub use scripted::{Pacing, RecognizerStats, ScriptedRecognizer};

pub const SUPPORTED_LOCALES: [&str; 6] = ["en-US", "zh-CN", "es-ES", "fr-FR", "de-DE", "ja-JP"];

pub const DEFAULT_LOCALE: &str = "en-US";

pub fn is_supported_locale(locale: &str) -> bool {
    SUPPORTED_LOCALES.contains(&locale)
}

#[derive(Debug, Clone)]
pub enum AsrEvent {
    Partial(PartialResult),
    /// Transient recognizer failure; later results may still arrive.
    Error(String),
}

pub type AsrStream = mpsc::Receiver<AsrEvent>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AsrError {
    #[error("speech recognition permission denied")]
    PermissionDenied,

    #[error("speech recognition not available: {0}")]
    EngineUnavailable(String),

    #[error("unsupported locale '{0}'")]
    UnsupportedLocale(String),
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Begin recognition for `locale` and hand back the result stream.
    async fn start(&self, locale: &str) -> Result<AsrStream, AsrError>;

    /// Stop recognition and release the audio input.
    async fn stop(&self);

    /// Suspend audio capture without tearing down the stream.
    async fn pause(&self) {}

    async fn resume(&self) -> Result<(), AsrError> {
        Ok(())
    }
}
