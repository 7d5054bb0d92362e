use crate::models::{PlaybackSegment, Segment};

/// Place segments on a timeline that starts at the first segment.
pub fn export_playback(segments: &[Segment]) -> Vec<PlaybackSegment> {
    let Some(origin) = segments.first().map(|segment| segment.started_at) else {
        return Vec::new();
    };

    segments
        .iter()
        .map(|segment| {
            let start_time = (segment.started_at - origin).num_milliseconds() as f64 / 1000.0;
            PlaybackSegment {
                start_time,
                end_time: start_time + segment.duration_secs,
                transcription: segment.text.clone(),
                translation: segment.translation.clone(),
                confidence: segment.confidence,
                language: segment.language.clone(),
                quality: segment.quality,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TranscriptionQuality;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn times_are_relative_to_first_segment() {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let segment = |text: &str, offset_ms: i64, duration_secs: f64| Segment {
            id: text.into(),
            text: text.into(),
            started_at: base + Duration::milliseconds(offset_ms),
            duration_secs,
            confidence: 0.8,
            language: "en-US".into(),
            quality: TranscriptionQuality::Good,
            translation: format!("{text}!"),
        };

        let exported = export_playback(&[
            segment("first", 2_000, 5.5),
            segment("second", 7_500, 6.0),
        ]);

        assert_eq!(exported.len(), 2);
        assert_eq!(exported[0].start_time, 0.0);
        assert_eq!(exported[0].end_time, 5.5);
        assert_eq!(exported[1].start_time, 5.5);
        assert_eq!(exported[1].end_time, 11.5);
        assert_eq!(exported[1].translation, "second!");
        assert_eq!(exported[1].quality, TranscriptionQuality::Good);
        assert!(export_playback(&[]).is_empty());
    }
}
