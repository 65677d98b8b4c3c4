//! Pure grading functions, one per exercise archetype.
//!
//! Every archetype has a key type (authoritative, author-provided) and an
//! answer type (what the learner produced). `AnswerKey` and `Answer` are the
//! tagged unions over all of them; `validate` dispatches on the pair and
//! rejects mismatched shapes instead of guessing.
//!
//! Scoring conventions shared by all archetypes:
//!   - score is `round(hits / total * max)`, zero when the key is empty
//!   - an answer that is not fully correct never reaches `max`
//!   - `correct` requires a non-empty key, no misses and no wrong picks

mod hotspot;
mod matching;
mod selection;
mod text;

use serde::{Deserialize, Serialize};

use crate::domain::ValidationResult;
use crate::error::ValidationError;

pub use hotspot::{hotspot, HotspotAnswer, HotspotKey, Point, Region};
pub use matching::{
  paint, sequence, zone_matching, PaintAnswer, PaintKey, SequenceAnswer, SequenceKey,
  ZoneMatchingAnswer, ZoneMatchingKey,
};
pub use selection::{
  decision, multiple_choice, timed_quiz, DecisionAnswer, DecisionChoice, DecisionItem,
  DecisionKey, MultipleChoiceAnswer, MultipleChoiceKey, TimedQuizAnswer, TimedQuizKey,
};
pub use text::{
  fill_blank, text_extraction, Blank, ExtractedPhrase, FillBlankAnswer, FillBlankKey,
  TextExtractionAnswer, TextExtractionKey,
};

/// Authoritative answer key, one variant per archetype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerKey {
  MultipleChoice(MultipleChoiceKey),
  ZoneMatching(ZoneMatchingKey),
  Sequence(SequenceKey),
  Decision(DecisionKey),
  Hotspot(HotspotKey),
  TimedQuiz(TimedQuizKey),
  TextExtraction(TextExtractionKey),
  FillBlank(FillBlankKey),
  Paint(PaintKey),
}

/// A learner's working answer, same variants as `AnswerKey`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
  MultipleChoice(MultipleChoiceAnswer),
  ZoneMatching(ZoneMatchingAnswer),
  Sequence(SequenceAnswer),
  Decision(DecisionAnswer),
  Hotspot(HotspotAnswer),
  TimedQuiz(TimedQuizAnswer),
  TextExtraction(TextExtractionAnswer),
  FillBlank(FillBlankAnswer),
  Paint(PaintAnswer),
}

impl AnswerKey {
  pub fn kind(&self) -> &'static str {
    match self {
      AnswerKey::MultipleChoice(_) => "multiple_choice",
      AnswerKey::ZoneMatching(_) => "zone_matching",
      AnswerKey::Sequence(_) => "sequence",
      AnswerKey::Decision(_) => "decision",
      AnswerKey::Hotspot(_) => "hotspot",
      AnswerKey::TimedQuiz(_) => "timed_quiz",
      AnswerKey::TextExtraction(_) => "text_extraction",
      AnswerKey::FillBlank(_) => "fill_blank",
      AnswerKey::Paint(_) => "paint",
    }
  }
}

impl Answer {
  pub fn kind(&self) -> &'static str {
    match self {
      Answer::MultipleChoice(_) => "multiple_choice",
      Answer::ZoneMatching(_) => "zone_matching",
      Answer::Sequence(_) => "sequence",
      Answer::Decision(_) => "decision",
      Answer::Hotspot(_) => "hotspot",
      Answer::TimedQuiz(_) => "timed_quiz",
      Answer::TextExtraction(_) => "text_extraction",
      Answer::FillBlank(_) => "fill_blank",
      Answer::Paint(_) => "paint",
    }
  }

  /// Whether the answer is complete enough to be graded.
  ///
  /// This is the gate callers apply before `submit`; grading itself accepts
  /// any answer of the right shape. A mismatched shape is never complete.
  pub fn is_complete(&self, key: &AnswerKey) -> bool {
    match (key, self) {
      (AnswerKey::MultipleChoice(_), Answer::MultipleChoice(a)) => !a.selected.is_empty(),
      (AnswerKey::ZoneMatching(k), Answer::ZoneMatching(a)) => {
        k.correct_mapping.keys().all(|item| a.placements.contains_key(item))
      }
      (AnswerKey::Sequence(k), Answer::Sequence(a)) => a.order.len() == k.correct_order.len(),
      (AnswerKey::Decision(k), Answer::Decision(a)) => selection::decision_is_complete(k, a),
      (AnswerKey::Hotspot(_), Answer::Hotspot(a)) => !a.clicks.is_empty(),
      // Running out of time submits whatever was answered.
      (AnswerKey::TimedQuiz(_), Answer::TimedQuiz(_)) => true,
      (AnswerKey::TextExtraction(_), Answer::TextExtraction(a)) => !a.extracted.is_empty(),
      (AnswerKey::FillBlank(k), Answer::FillBlank(a)) => k.blanks.iter().all(|b| {
        a.entries.get(&b.id).map(|e| !e.trim().is_empty()).unwrap_or(false)
      }),
      (AnswerKey::Paint(_), Answer::Paint(a)) => !a.painted.is_empty(),
      _ => false,
    }
  }
}

/// Grade `answer` against `key`, dispatching on the archetype.
pub fn validate(
  key: &AnswerKey,
  answer: &Answer,
  max_points: u32,
) -> Result<ValidationResult, ValidationError> {
  let result = match (key, answer) {
    (AnswerKey::MultipleChoice(k), Answer::MultipleChoice(a)) => multiple_choice(k, a, max_points),
    (AnswerKey::ZoneMatching(k), Answer::ZoneMatching(a)) => zone_matching(k, a, max_points),
    (AnswerKey::Sequence(k), Answer::Sequence(a)) => sequence(k, a, max_points),
    (AnswerKey::Decision(k), Answer::Decision(a)) => decision(k, a, max_points),
    (AnswerKey::Hotspot(k), Answer::Hotspot(a)) => hotspot(k, a, max_points),
    (AnswerKey::TimedQuiz(k), Answer::TimedQuiz(a)) => timed_quiz(k, a, max_points),
    (AnswerKey::TextExtraction(k), Answer::TextExtraction(a)) => text_extraction(k, a, max_points),
    (AnswerKey::FillBlank(k), Answer::FillBlank(a)) => fill_blank(k, a, max_points),
    (AnswerKey::Paint(k), Answer::Paint(a)) => paint(k, a, max_points),
    _ => {
      return Err(ValidationError::ShapeMismatch { expected: key.kind(), found: answer.kind() })
    }
  };
  Ok(result)
}

/// Proportional credit: `round(hits / total * max)`.
///
/// Returns `max` only for a fully correct answer; anything less is capped at
/// `max - 1`. An empty key scores zero.
pub fn partial_score(hits: usize, total: usize, max: u32, fully_correct: bool) -> u32 {
  if fully_correct {
    return max;
  }
  if total == 0 {
    return 0;
  }
  let ratio = hits.min(total) as f64 / total as f64;
  let raw = (ratio * max as f64).round() as u32;
  raw.min(max.saturating_sub(1))
}

/// "3 of 5 correct"
pub(crate) fn count_feedback(hits: usize, total: usize) -> String {
  format!("{} of {} correct", hits, total)
}

/// Trim, collapse inner whitespace and optionally lowercase.
pub(crate) fn normalize_text(s: &str, case_sensitive: bool) -> String {
  let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
  if case_sensitive { collapsed } else { collapsed.to_lowercase() }
}
