use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Segment;

use super::scoring::semantic_gap;
use super::signals::detect_sentence_end;

const MAX_GROUP_DURATION_SECS: f64 = 10.0;
const MAX_GROUP_TEXT_CHARS: usize = 100;
const MAX_SEMANTIC_GAP: f64 = 0.7;
const MAX_TIME_GAP_SECS: f64 = 3.0;

/// What an advisor gets to see of a segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MergeCandidate {
    pub id: String,
    pub text: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl From<&Segment> for MergeCandidate {
    fn from(segment: &Segment) -> Self {
        Self {
            id: segment.id.clone(),
            text: segment.text.clone(),
            started_at: segment.started_at,
            ended_at: segment.ended_at(),
        }
    }
}

/// A set of segments the advisor recommends fusing into one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MergeGroup {
    pub segment_ids: BTreeSet<String>,
    pub reason: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AdvisorError {
    #[error("advisor unavailable: {0}")]
    Unavailable(String),
}

/// Recommends groups of adjacent segments to merge after a session ends.
#[async_trait]
pub trait MergeAdvisor: Send + Sync {
    async fn recommend_merges(
        &self,
        candidates: &[MergeCandidate],
    ) -> Result<Vec<MergeGroup>, AdvisorError>;
}

/// Local advisor that groups short, related, closely spaced segments.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicMergeAdvisor;

impl HeuristicMergeAdvisor {
    fn should_close(group: &[&MergeCandidate], next: &MergeCandidate) -> bool {
        let Some(last) = group.last() else {
            return true;
        };

        let duration_secs: f64 = group
            .iter()
            .map(|candidate| {
                (candidate.ended_at - candidate.started_at).num_milliseconds() as f64 / 1000.0
            })
            .sum();
        let joined = join_texts(group);
        if duration_secs >= MAX_GROUP_DURATION_SECS
            || joined.chars().count() >= MAX_GROUP_TEXT_CHARS
        {
            return true;
        }

        if semantic_gap(&joined, &next.text) > MAX_SEMANTIC_GAP {
            return true;
        }

        let time_gap_secs = (next.started_at - last.ended_at).num_milliseconds() as f64 / 1000.0;
        if time_gap_secs > MAX_TIME_GAP_SECS {
            return true;
        }

        detect_sentence_end(&last.text) && group.len() >= 2
    }
}

fn join_texts(group: &[&MergeCandidate]) -> String {
    group
        .iter()
        .map(|candidate| candidate.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl MergeAdvisor for HeuristicMergeAdvisor {
    async fn recommend_merges(
        &self,
        candidates: &[MergeCandidate],
    ) -> Result<Vec<MergeGroup>, AdvisorError> {
        let mut ordered: Vec<&MergeCandidate> = candidates.iter().collect();
        ordered.sort_by_key(|candidate| candidate.started_at);

        let mut groups = Vec::new();
        let mut current: Vec<&MergeCandidate> = Vec::new();

        for candidate in ordered {
            if !current.is_empty() && Self::should_close(&current, candidate) {
                push_group(&mut groups, std::mem::take(&mut current));
            }
            current.push(candidate);
        }
        push_group(&mut groups, current);

        Ok(groups)
    }
}

fn push_group(groups: &mut Vec<MergeGroup>, members: Vec<&MergeCandidate>) {
    if members.len() < 2 {
        return;
    }
    groups.push(MergeGroup {
        segment_ids: members.iter().map(|candidate| candidate.id.clone()).collect(),
        reason: format!("{} adjacent fragments of one utterance", members.len()),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn candidate(id: &str, text: &str, start_ms: i64, end_ms: i64) -> MergeCandidate {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        MergeCandidate {
            id: id.into(),
            text: text.into(),
            started_at: base + Duration::milliseconds(start_ms),
            ended_at: base + Duration::milliseconds(end_ms),
        }
    }

    #[tokio::test]
    async fn groups_related_neighbours() {
        let candidates = vec![
            candidate("a", "the cat sat on the mat", 0, 2_000),
            candidate("b", "the cat sat on the rug", 2_500, 4_500),
            candidate("c", "a completely different topic now", 5_000, 7_000),
        ];

        let groups = HeuristicMergeAdvisor
            .recommend_merges(&candidates)
            .await
            .unwrap();

        assert_eq!(groups.len(), 1);
        let ids: Vec<&str> = groups[0].segment_ids.iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn long_silence_splits_groups() {
        let candidates = vec![
            candidate("a", "we will meet on monday", 0, 2_000),
            candidate("b", "we will meet on tuesday", 6_000, 8_000),
        ];

        let groups = HeuristicMergeAdvisor
            .recommend_merges(&candidates)
            .await
            .unwrap();
        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn empty_input_recommends_nothing() {
        let groups = HeuristicMergeAdvisor.recommend_merges(&[]).await.unwrap();
        assert!(groups.is_empty());
    }
}
