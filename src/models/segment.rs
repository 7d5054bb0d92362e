use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Recognition quality of a segment.
///
/// Variants are declared worst to best so the derived `Ord` is the ranking
/// used when merged segments keep the best quality of their members.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionQuality {
    Unknown,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl Default for TranscriptionQuality {
    fn default() -> Self {
        TranscriptionQuality::Unknown
    }
}

impl TranscriptionQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionQuality::Unknown => "unknown",
            TranscriptionQuality::Poor => "poor",
            TranscriptionQuality::Fair => "fair",
            TranscriptionQuality::Good => "good",
            TranscriptionQuality::Excellent => "excellent",
        }
    }

    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.9 {
            TranscriptionQuality::Excellent
        } else if confidence >= 0.7 {
            TranscriptionQuality::Good
        } else if confidence >= 0.5 {
            TranscriptionQuality::Fair
        } else {
            TranscriptionQuality::Poor
        }
    }
}

/// A finalized slice of the live transcript.
///
/// Everything except `translation` is fixed once the segment is appended;
/// the translation is patched in by id when the background job completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: String,
    pub text: String,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub confidence: f64,
    pub language: String,
    pub quality: TranscriptionQuality,
    #[serde(default)]
    pub translation: String,
}

impl Segment {
    pub fn duration(&self) -> Duration {
        Duration::milliseconds((self.duration_secs * 1000.0).round() as i64)
    }

    pub fn ended_at(&self) -> DateTime<Utc> {
        self.started_at + self.duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_order_ranks_unknown_lowest() {
        let mut levels = vec![
            TranscriptionQuality::Good,
            TranscriptionQuality::Unknown,
            TranscriptionQuality::Excellent,
            TranscriptionQuality::Poor,
            TranscriptionQuality::Fair,
        ];
        levels.sort();
        assert_eq!(
            levels,
            vec![
                TranscriptionQuality::Unknown,
                TranscriptionQuality::Poor,
                TranscriptionQuality::Fair,
                TranscriptionQuality::Good,
                TranscriptionQuality::Excellent,
            ]
        );
    }

    #[test]
    fn confidence_bands() {
        assert_eq!(TranscriptionQuality::from_confidence(0.95), TranscriptionQuality::Excellent);
        assert_eq!(TranscriptionQuality::from_confidence(0.9), TranscriptionQuality::Excellent);
        assert_eq!(TranscriptionQuality::from_confidence(0.75), TranscriptionQuality::Good);
        assert_eq!(TranscriptionQuality::from_confidence(0.5), TranscriptionQuality::Fair);
        assert_eq!(TranscriptionQuality::from_confidence(0.2), TranscriptionQuality::Poor);
    }

    #[test]
    fn ended_at_adds_duration() {
        let start = Utc::now();
        let segment = Segment {
            id: "s".into(),
            text: "hello".into(),
            started_at: start,
            duration_secs: 2.5,
            confidence: 0.9,
            language: "en-US".into(),
            quality: TranscriptionQuality::Excellent,
            translation: String::new(),
        };
        assert_eq!(segment.ended_at() - start, Duration::milliseconds(2500));
    }
}
