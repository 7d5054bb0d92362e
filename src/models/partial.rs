use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TranscriptionQuality;

/// One recognized word with its position in the audio, in seconds from the
/// start of the recognition stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WordSpan {
    pub text: String,
    pub start_offset: f64,
    pub duration: f64,
    pub confidence: f64,
}

impl WordSpan {
    pub fn end_offset(&self) -> f64 {
        self.start_offset + self.duration
    }
}

/// The recognizer's current best hypothesis for the whole utterance so far.
///
/// Each result replaces the previous one: the text may grow, shrink or be
/// rewritten until `is_final` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PartialResult {
    pub full_text: String,
    #[serde(default)]
    pub word_spans: Vec<WordSpan>,
    #[serde(default)]
    pub is_final: bool,
    pub received_at: DateTime<Utc>,
}

impl PartialResult {
    pub fn new(full_text: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            full_text: full_text.into(),
            word_spans: Vec::new(),
            is_final: false,
            received_at,
        }
    }

    pub fn with_spans(mut self, word_spans: Vec<WordSpan>) -> Self {
        self.word_spans = word_spans;
        self
    }

    pub fn finalized(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Length in characters, the unit the extraction cursor counts in.
    pub fn char_len(&self) -> usize {
        self.full_text.chars().count()
    }

    /// Mean word confidence, `None` when the recognizer reported no spans.
    pub fn average_confidence(&self) -> Option<f64> {
        if self.word_spans.is_empty() {
            return None;
        }
        let total: f64 = self.word_spans.iter().map(|span| span.confidence).sum();
        Some(total / self.word_spans.len() as f64)
    }

    pub fn quality(&self) -> TranscriptionQuality {
        self.average_confidence()
            .map(TranscriptionQuality::from_confidence)
            .unwrap_or(TranscriptionQuality::Unknown)
    }
}
