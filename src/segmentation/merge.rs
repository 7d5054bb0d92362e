use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::models::Segment;

use super::advisor::{MergeAdvisor, MergeCandidate, MergeGroup};
use super::scoring::{best_quality, mean_confidence};
use crate::{log_debug, log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// Fuse `members` into one segment.
///
/// Members are taken in start order. A single member is returned unchanged.
pub fn merge_group(members: &[Segment]) -> Option<Segment> {
    let mut ordered: Vec<&Segment> = members.iter().collect();
    ordered.sort_by_key(|segment| segment.started_at);

    let first = *ordered.first()?;
    if ordered.len() == 1 {
        return Some(first.clone());
    }

    let text = ordered
        .iter()
        .map(|segment| segment.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let translation = ordered
        .iter()
        .map(|segment| segment.translation.as_str())
        .filter(|translation| !translation.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Some(Segment {
        id: Uuid::new_v4().to_string(),
        text,
        started_at: first.started_at,
        duration_secs: ordered.iter().map(|segment| segment.duration_secs).sum(),
        confidence: mean_confidence(members),
        language: first.language.clone(),
        quality: best_quality(members),
        translation,
    })
}

/// Replace every group's members by their merged segment.
///
/// Unknown ids and ids already consumed by an earlier group are dropped from
/// a group; the rest still merge. A group left with one member merges
/// nothing. Segments outside any group pass through. The result is ordered
/// by start time.
pub fn apply_merge_groups(segments: Vec<Segment>, groups: &[MergeGroup]) -> Vec<Segment> {
    let mut consumed: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();

    for group in groups {
        let members: Vec<Segment> = segments
            .iter()
            .filter(|segment| {
                group.segment_ids.contains(&segment.id) && !consumed.contains(&segment.id)
            })
            .cloned()
            .collect();

        if members.len() < group.segment_ids.len() {
            log_warn!(
                "[MERGE] ignoring unknown or reused ids in group {:?}",
                group.segment_ids
            );
        }
        if members.len() < 2 {
            continue;
        }

        if let Some(segment) = merge_group(&members) {
            log_debug!(
                "[MERGE] merged {} segments ({})",
                members.len(),
                group.reason
            );
            consumed.extend(members.iter().map(|member| member.id.clone()));
            merged.push(segment);
        }
    }

    let mut result: Vec<Segment> = segments
        .into_iter()
        .filter(|segment| !consumed.contains(&segment.id))
        .chain(merged)
        .collect();
    result.sort_by_key(|segment| segment.started_at);
    result
}

/// Runs a [`MergeAdvisor`] over a finished session's segments.
#[derive(Clone)]
pub struct PostSessionOptimizer {
    advisor: Arc<dyn MergeAdvisor>,
}

impl PostSessionOptimizer {
    pub fn new(advisor: Arc<dyn MergeAdvisor>) -> Self {
        Self { advisor }
    }

    /// Merge fragments the advisor groups together. Advisor failure leaves
    /// the list as it was.
    pub async fn optimize(&self, segments: Vec<Segment>) -> Vec<Segment> {
        if segments.len() < 2 {
            return segments;
        }

        let candidates: Vec<MergeCandidate> = segments.iter().map(MergeCandidate::from).collect();
        let groups = match self.advisor.recommend_merges(&candidates).await {
            Ok(groups) => groups,
            Err(e) => {
                log_warn!("[MERGE] advisor failed, keeping segments: {}", e);
                return segments;
            }
        };

        if groups.is_empty() {
            return segments;
        }

        let before = segments.len();
        let optimized = apply_merge_groups(segments, &groups);
        log_info!("[MERGE] optimized {} -> {} segments", before, optimized.len());
        optimized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TranscriptionQuality;
    use crate::segmentation::advisor::AdvisorError;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::BTreeSet;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn segment(
        id: &str,
        text: &str,
        start_secs: i64,
        duration_secs: f64,
        confidence: f64,
    ) -> Segment {
        Segment {
            id: id.into(),
            text: text.into(),
            started_at: base() + Duration::seconds(start_secs),
            duration_secs,
            confidence,
            language: "en-US".into(),
            quality: TranscriptionQuality::from_confidence(confidence),
            translation: String::new(),
        }
    }

    fn group(ids: &[&str]) -> MergeGroup {
        MergeGroup {
            segment_ids: ids.iter().map(|id| id.to_string()).collect::<BTreeSet<_>>(),
            reason: "test".into(),
        }
    }

    struct FixedAdvisor(Result<Vec<MergeGroup>, AdvisorError>);

    #[async_trait]
    impl MergeAdvisor for FixedAdvisor {
        async fn recommend_merges(
            &self,
            _candidates: &[MergeCandidate],
        ) -> Result<Vec<MergeGroup>, AdvisorError> {
            self.0.clone()
        }
    }

    #[test]
    fn merges_two_fragments() {
        let first = segment("a", "Hello", 0, 2.0, 0.8);
        let second = segment("b", "world.", 2, 3.0, 0.6);

        let merged = merge_group(&[second, first]).unwrap();
        assert_eq!(merged.text, "Hello world.");
        assert_eq!(merged.started_at, base());
        assert!((merged.duration_secs - 5.0).abs() < 1e-9);
        assert!((merged.confidence - 0.7).abs() < 1e-9);
        assert_eq!(merged.quality, TranscriptionQuality::Good);
        assert_ne!(merged.id, "a");
        assert_ne!(merged.id, "b");
    }

    #[test]
    fn single_member_passes_through() {
        let only = segment("a", "Alone.", 0, 1.0, 0.9);
        assert_eq!(merge_group(std::slice::from_ref(&only)), Some(only));
        assert_eq!(merge_group(&[]), None);
    }

    #[test]
    fn translations_join_skipping_empty() {
        let mut first = segment("a", "Hello", 0, 1.0, 0.9);
        first.translation = "你好".into();
        let second = segment("b", "again", 1, 1.0, 0.9);
        let mut third = segment("c", "friend.", 2, 1.0, 0.9);
        third.translation = "朋友".into();

        let merged = merge_group(&[first, second, third]).unwrap();
        assert_eq!(merged.translation, "你好 朋友");
    }

    #[test]
    fn apply_keeps_untouched_segments_in_order() {
        let segments = vec![
            segment("a", "one", 0, 1.0, 0.9),
            segment("b", "two", 1, 1.0, 0.9),
            segment("c", "three.", 2, 1.0, 0.9),
            segment("d", "Four", 10, 1.0, 0.9),
        ];

        let groups = [group(&["b", "c"]), group(&["c", "d"]), group(&["x", "a"])];
        let result = apply_merge_groups(segments, &groups);

        let texts: Vec<&str> = result.iter().map(|segment| segment.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two three.", "Four"]);
    }

    #[test]
    fn unknown_ids_do_not_block_the_rest_of_a_group() {
        let segments = vec![
            segment("a", "Hello", 0, 2.0, 0.8),
            segment("b", "world.", 2, 3.0, 0.6),
        ];

        let result = apply_merge_groups(segments, &[group(&["a", "b", "zzz"])]);

        let texts: Vec<&str> = result.iter().map(|segment| segment.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello world."]);
    }

    #[test]
    fn reused_ids_are_dropped_and_the_remainder_merges() {
        let segments = vec![
            segment("a", "one", 0, 1.0, 0.9),
            segment("b", "two", 1, 1.0, 0.9),
            segment("c", "three", 2, 1.0, 0.9),
            segment("d", "four", 3, 1.0, 0.9),
        ];

        let groups = [group(&["a", "b"]), group(&["b", "c", "d"])];
        let result = apply_merge_groups(segments, &groups);

        let texts: Vec<&str> = result.iter().map(|segment| segment.text.as_str()).collect();
        assert_eq!(texts, vec!["one two", "three four"]);
    }

    #[tokio::test]
    async fn optimizer_failure_is_a_no_op() {
        let segments = vec![
            segment("a", "Hello", 0, 2.0, 0.8),
            segment("b", "world.", 2, 3.0, 0.6),
        ];

        let failing = PostSessionOptimizer::new(Arc::new(FixedAdvisor(Err(
            AdvisorError::Unavailable("offline".into()),
        ))));
        assert_eq!(failing.optimize(segments.clone()).await, segments);

        let empty = PostSessionOptimizer::new(Arc::new(FixedAdvisor(Ok(Vec::new()))));
        assert_eq!(empty.optimize(segments.clone()).await, segments);

        let merging =
            PostSessionOptimizer::new(Arc::new(FixedAdvisor(Ok(vec![group(&["a", "b"])]))));
        let merged = merging.optimize(segments).await;
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "Hello world.");
    }
}
