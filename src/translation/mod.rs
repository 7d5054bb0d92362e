//! Translation backend boundary and the per-segment dispatcher.

pub mod dispatcher;
pub mod language;
pub mod qwen;

use async_trait::async_trait;
use serde::Serialize;

pub use dispatcher::TranslationDispatcher;
pub use language::{build_context, detect_language, language_display_name, target_language_for};
pub use qwen::QwenTranslator;

/// One translation job.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    pub text: String,
    pub source_language: String,
    pub target_language: String,
    /// Recent transcript for disambiguation; empty for the first segment.
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    #[error("No API key configured")]
    NoApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: HTTP {status}")]
    Api { status: u16 },

    #[error("Invalid response from API")]
    InvalidResponse,

    #[error("Text is empty")]
    EmptyText,
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, TranslationError>;
}

/// Stand-in used when no backend is configured; every job resolves to the
/// "no API key" error so the segment shows why it has no translation.
pub struct DisabledTranslator;

#[async_trait]
impl Translator for DisabledTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, TranslationError> {
        if request.text.trim().is_empty() {
            return Err(TranslationError::EmptyText);
        }
        Err(TranslationError::NoApiKey)
    }
}
