//! Boundary signal evaluation.
//!
//! Pure functions over a transcript snapshot. Event-driven checks (a partial
//! result changed the text) and timer-driven checks (periodic tick, no new
//! text) go through the same [`evaluate`] ladder; the [`Trigger`] only decides
//! which rungs are eligible.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::WordSpan;

use super::config::{SegmentationConfig, SegmentationStrategy};

const SENTENCE_ENDERS: [char; 6] = ['.', '!', '?', '。', '！', '？'];

const ABBREVIATIONS: [&str; 9] = ["Dr", "Mr", "Mrs", "Ms", "Prof", "etc", "vs", "Inc", "Ltd"];

const CLAUSE_MARKERS: [&str; 22] = [
    ", and ",
    ", but ",
    ", so ",
    ", because ",
    ", although ",
    ", however ",
    ", while ",
    ", when ",
    ", where ",
    ", which ",
    ", that ",
    "，而且",
    "，但是",
    "，所以",
    "，因为",
    "，虽然",
    "，然而",
    "，当",
    "，在",
    "，如果",
    "，除非",
    "，直到",
];

/// Lowercase; English entries are space-delimited so they only match whole words.
const TRANSITION_MARKERS: [&str; 17] = [
    " first ",
    " second ",
    " third ",
    " finally ",
    " in conclusion ",
    " moreover ",
    " furthermore ",
    " on the other hand ",
    " in addition ",
    "首先",
    "其次",
    "然后",
    "最后",
    "总之",
    "另外",
    "此外",
    "另一方面",
];

/// Clause after a marker must be at least this long to count as a pause.
const MIN_TRAILING_CLAUSE_CHARS: usize = 5;

/// Rules that can open a boundary, in ladder priority order.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BoundarySignal {
    SentenceCompletion,
    GrammaticalPause,
    FinalResult,
    SemanticUnit,
    AcousticPause,
    PauseFallback,
    ForcedTimeout,
}

impl BoundarySignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundarySignal::SentenceCompletion => "sentence completion",
            BoundarySignal::GrammaticalPause => "grammatical pause",
            BoundarySignal::FinalResult => "recognizer final",
            BoundarySignal::SemanticUnit => "semantic unit",
            BoundarySignal::AcousticPause => "acoustic pause",
            BoundarySignal::PauseFallback => "pause fallback",
            BoundarySignal::ForcedTimeout => "forced timeout",
        }
    }

    /// The forced timeout is an overflow valve and ignores the length gates.
    pub fn bypasses_content_gates(&self) -> bool {
        matches!(self, BoundarySignal::ForcedTimeout)
    }
}

/// What caused this evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A partial result arrived with a different text length.
    TextChanged,
    /// A partial result arrived with the same text length.
    TextUnchanged,
    /// The periodic fallback timer fired.
    Tick,
}

/// Snapshot handed to the evaluator.
#[derive(Debug, Clone, Copy)]
pub struct SignalInput<'a> {
    pub text: &'a str,
    pub word_spans: &'a [WordSpan],
    pub is_final: bool,
    pub now: DateTime<Utc>,
    pub segment_started_at: DateTime<Utc>,
    pub last_change_at: DateTime<Utc>,
    pub last_boundary_at: DateTime<Utc>,
}

/// Return the first rule of the ladder that matches, if any.
pub fn evaluate(
    input: &SignalInput<'_>,
    trigger: Trigger,
    config: &SegmentationConfig,
) -> Option<BoundarySignal> {
    if content_gates_open(input, config) {
        let signal = match trigger {
            Trigger::TextChanged => evaluate_text_rules(input, config),
            Trigger::TextUnchanged | Trigger::Tick => evaluate_pause_fallback(input, config),
        };
        if signal.is_some() {
            return signal;
        }
    }

    if input.now - input.last_boundary_at >= config.max_segment_duration() {
        return Some(BoundarySignal::ForcedTimeout);
    }

    None
}

/// Total-length gate plus dwell-time gate shared by every rule except the
/// forced timeout.
pub fn content_gates_open(input: &SignalInput<'_>, config: &SegmentationConfig) -> bool {
    input.text.chars().count() >= config.min_total_content_chars
        && input.now - input.segment_started_at >= config.min_segment_duration()
}

fn evaluate_text_rules(
    input: &SignalInput<'_>,
    config: &SegmentationConfig,
) -> Option<BoundarySignal> {
    if detect_sentence_end(input.text) {
        return Some(BoundarySignal::SentenceCompletion);
    }
    if detect_grammatical_pause(input.text) {
        return Some(BoundarySignal::GrammaticalPause);
    }
    if input.is_final {
        return Some(BoundarySignal::FinalResult);
    }
    if detect_semantic_unit(input.text) {
        return Some(BoundarySignal::SemanticUnit);
    }
    if config.strategy == SegmentationStrategy::Hybrid
        && detect_acoustic_pause(input.word_spans, config.acoustic_pause_threshold_secs())
    {
        return Some(BoundarySignal::AcousticPause);
    }
    None
}

fn evaluate_pause_fallback(
    input: &SignalInput<'_>,
    config: &SegmentationConfig,
) -> Option<BoundarySignal> {
    let quiet_for = input.now - input.last_change_at;
    if !input.text.trim().is_empty() && quiet_for >= config.pause_fallback_interval() {
        return Some(BoundarySignal::PauseFallback);
    }
    None
}

/// Trimmed text ends a sentence and the word before the mark is not an
/// abbreviation. Ellipses always count.
pub fn detect_sentence_end(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.ends_with("...") || trimmed.ends_with('…') {
        return true;
    }

    let Some(last) = trimmed.chars().last() else {
        return false;
    };
    if !SENTENCE_ENDERS.contains(&last) {
        return false;
    }

    let before = &trimmed[..trimmed.len() - last.len_utf8()];
    !ends_with_abbreviation(before)
}

fn ends_with_abbreviation(text: &str) -> bool {
    let token = text.split_whitespace().last().unwrap_or("");
    let token = token.trim_start_matches(|c: char| !c.is_alphanumeric());
    ABBREVIATIONS.contains(&token)
}

/// A clause-boundary connective followed by a clause of real content.
pub fn detect_grammatical_pause(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().count() < 10 {
        return false;
    }

    CLAUSE_MARKERS.iter().any(|marker| {
        trimmed
            .rsplit_once(marker)
            .map(|(_, tail)| tail.chars().count() >= MIN_TRAILING_CLAUSE_CHARS)
            .unwrap_or(false)
    })
}

/// Discourse transition words, or a question and a statement in the same text.
pub fn detect_semantic_unit(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().count() < 20 {
        return false;
    }

    let lowered = trimmed.to_lowercase();
    if TRANSITION_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        return true;
    }

    trimmed.contains('?') && trimmed.contains('.')
}

/// Silence between the last two recognized words.
pub fn detect_acoustic_pause(spans: &[WordSpan], threshold_secs: f64) -> bool {
    let [.., previous, last] = spans else {
        return false;
    };
    last.start_offset - previous.end_offset() >= threshold_secs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn at(ms: i64) -> DateTime<Utc> {
        t0() + Duration::milliseconds(ms)
    }

    fn padded(tail: &str) -> String {
        // Filler long enough to clear the 100 character gate on its own.
        let filler = "we walked along the river for a long while talking about nothing in particular today ";
        format!("{filler}{tail}")
    }

    fn input<'a>(text: &'a str, now_ms: i64) -> SignalInput<'a> {
        SignalInput {
            text,
            word_spans: &[],
            is_final: false,
            now: at(now_ms),
            segment_started_at: t0(),
            last_change_at: at(now_ms),
            last_boundary_at: t0(),
        }
    }

    fn span(start: f64, duration: f64) -> WordSpan {
        WordSpan {
            text: "w".into(),
            start_offset: start,
            duration,
            confidence: 0.9,
        }
    }

    #[test]
    fn abbreviation_does_not_end_sentence() {
        assert!(!detect_sentence_end("Yesterday I finally met Dr."));
        assert!(!detect_sentence_end("apples, pears, etc."));
        assert!(detect_sentence_end("It is done."));
        assert!(detect_sentence_end("Is it done? "));
        assert!(detect_sentence_end("我们开始吧。"));
        assert!(detect_sentence_end("and then..."));
        assert!(detect_sentence_end("and then…"));
        assert!(!detect_sentence_end("and then"));
        assert!(!detect_sentence_end("   "));
    }

    #[test]
    fn grammatical_pause_needs_trailing_clause() {
        assert!(detect_grammatical_pause("I wanted to go, but it was raining"));
        assert!(!detect_grammatical_pause("I wanted to go, but it"));
        assert!(detect_grammatical_pause("我想去公园，但是今天下雨了呢"));
    }

    #[test]
    fn semantic_unit_markers() {
        assert!(detect_semantic_unit("there are two steps and first we open it"));
        assert!(detect_semantic_unit("是这样的，首先我们需要准备一些材料然后再开始动手"));
        assert!(detect_semantic_unit("Did it work? It did. Mostly fine"));
        assert!(!detect_semantic_unit("a plain run of words without markers"));
    }

    #[test]
    fn acoustic_pause_uses_last_word_gap() {
        assert!(detect_acoustic_pause(&[span(0.0, 0.3), span(1.5, 0.2)], 0.8));
        assert!(!detect_acoustic_pause(&[span(0.0, 0.3), span(0.5, 0.2)], 0.8));
        assert!(!detect_acoustic_pause(&[span(0.0, 0.3)], 0.8));
    }

    #[test]
    fn content_rules_wait_for_dwell_time() {
        let config = SegmentationConfig::default();
        let text = padded("and it is done.");
        assert!(text.chars().count() >= 100);

        assert_eq!(evaluate(&input(&text, 4_900), Trigger::TextChanged, &config), None);
        assert_eq!(
            evaluate(&input(&text, 5_100), Trigger::TextChanged, &config),
            Some(BoundarySignal::SentenceCompletion)
        );
    }

    #[test]
    fn content_rules_wait_for_total_length() {
        let config = SegmentationConfig::default();
        let text = "It is done.";
        assert_eq!(evaluate(&input(text, 9_000), Trigger::TextChanged, &config), None);
    }

    #[test]
    fn ladder_prefers_sentence_end_over_final_flag() {
        let config = SegmentationConfig::default();
        let text = padded("and it is done.");
        let mut snapshot = input(&text, 6_000);
        snapshot.is_final = true;
        assert_eq!(
            evaluate(&snapshot, Trigger::TextChanged, &config),
            Some(BoundarySignal::SentenceCompletion)
        );

        let open = padded("and it keeps going");
        let mut snapshot = input(&open, 6_000);
        snapshot.is_final = true;
        assert_eq!(
            evaluate(&snapshot, Trigger::TextChanged, &config),
            Some(BoundarySignal::FinalResult)
        );
    }

    #[test]
    fn acoustic_pause_only_in_hybrid_strategy() {
        let spans = [span(0.0, 0.3), span(2.0, 0.2)];
        let text = padded("and it keeps going");
        let mut snapshot = input(&text, 6_000);
        snapshot.word_spans = &spans;

        let hybrid = SegmentationConfig::default();
        assert_eq!(
            evaluate(&snapshot, Trigger::TextChanged, &hybrid),
            Some(BoundarySignal::AcousticPause)
        );

        let semantic = SegmentationConfig {
            strategy: SegmentationStrategy::Semantic,
            ..SegmentationConfig::default()
        };
        assert_eq!(evaluate(&snapshot, Trigger::TextChanged, &semantic), None);
    }

    #[test]
    fn pause_fallback_only_on_quiet_checks() {
        let config = SegmentationConfig::default();
        let text = padded("and it keeps going");
        let mut snapshot = input(&text, 7_000);
        snapshot.last_change_at = at(500);

        assert_eq!(
            evaluate(&snapshot, Trigger::Tick, &config),
            Some(BoundarySignal::PauseFallback)
        );
        assert_eq!(
            evaluate(&snapshot, Trigger::TextUnchanged, &config),
            Some(BoundarySignal::PauseFallback)
        );
        assert_eq!(evaluate(&snapshot, Trigger::TextChanged, &config), None);

        snapshot.last_change_at = at(2_000);
        assert_eq!(evaluate(&snapshot, Trigger::Tick, &config), None);
    }

    #[test]
    fn forced_timeout_ignores_content_gates() {
        let config = SegmentationConfig::default();
        let mut snapshot = input("short", 20_000);
        snapshot.last_change_at = at(19_000);
        assert_eq!(
            evaluate(&snapshot, Trigger::Tick, &config),
            Some(BoundarySignal::ForcedTimeout)
        );
        assert_eq!(
            evaluate(&snapshot, Trigger::TextChanged, &config),
            Some(BoundarySignal::ForcedTimeout)
        );

        let early = input("short", 19_999);
        assert_eq!(evaluate(&early, Trigger::Tick, &config), None);
    }
}
