use std::collections::HashSet;

use crate::models::{Segment, TranscriptionQuality};

/// Arithmetic mean of the members' confidence, 0.0 for an empty slice.
pub fn mean_confidence(segments: &[Segment]) -> f64 {
    if segments.is_empty() {
        return 0.0;
    }
    let total: f64 = segments.iter().map(|segment| segment.confidence).sum();
    total / segments.len() as f64
}

/// Highest quality among the members.
pub fn best_quality(segments: &[Segment]) -> TranscriptionQuality {
    segments
        .iter()
        .map(|segment| segment.quality)
        .max()
        .unwrap_or_default()
}

/// Word-level Jaccard distance between two texts: 0.0 for identical word
/// sets, 1.0 for disjoint ones (or when both are empty).
pub fn semantic_gap(left: &str, right: &str) -> f64 {
    let left_lower = left.to_lowercase();
    let right_lower = right.to_lowercase();
    let left_words: HashSet<&str> = left_lower.split_whitespace().collect();
    let right_words: HashSet<&str> = right_lower.split_whitespace().collect();

    let union = left_words.union(&right_words).count();
    if union == 0 {
        return 1.0;
    }
    let intersection = left_words.intersection(&right_words).count();
    1.0 - intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn segment(confidence: f64, quality: TranscriptionQuality) -> Segment {
        Segment {
            id: "s".into(),
            text: "text".into(),
            started_at: Utc::now(),
            duration_secs: 1.0,
            confidence,
            language: "en-US".into(),
            quality,
            translation: String::new(),
        }
    }

    #[test]
    fn confidence_and_quality_aggregate() {
        let members = vec![
            segment(0.8, TranscriptionQuality::Good),
            segment(0.6, TranscriptionQuality::Fair),
        ];
        assert!((mean_confidence(&members) - 0.7).abs() < 1e-9);
        assert_eq!(best_quality(&members), TranscriptionQuality::Good);
        assert_eq!(mean_confidence(&[]), 0.0);
        assert_eq!(best_quality(&[]), TranscriptionQuality::Unknown);
    }

    #[test]
    fn semantic_gap_is_jaccard_distance() {
        assert_eq!(semantic_gap("The cat", "the CAT"), 0.0);
        assert_eq!(semantic_gap("alpha beta", "gamma delta"), 1.0);
        assert_eq!(semantic_gap("", "  "), 1.0);

        // {the, cat, sat} vs {the, dog, sat}: 2 shared of 4
        assert!((semantic_gap("the cat sat", "the dog sat") - 0.5).abs() < 1e-9);
    }
}
