//! Selection-style archetypes: multiple choice, decision tables, timed quizzes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{count_feedback, partial_score};
use crate::domain::{ItemDetail, ValidationResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleChoiceKey {
  pub correct_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleChoiceAnswer {
  #[serde(default)] pub selected: Vec<String>,
}

/// Each wrong pick cancels one right pick, so "select everything" never
/// earns credit. Missed and wrong picks both block `correct`.
pub fn multiple_choice(key: &MultipleChoiceKey, answer: &MultipleChoiceAnswer, max: u32) -> ValidationResult {
  let expected: BTreeSet<&str> = key.correct_ids.iter().map(String::as_str).collect();
  let selected: BTreeSet<&str> = answer.selected.iter().map(String::as_str).collect();

  let hits = expected.intersection(&selected).count();
  let wrong: Vec<&str> = selected.difference(&expected).copied().collect();
  let missed = expected.len() - hits;
  let total = expected.len();

  let correct = total > 0 && missed == 0 && wrong.is_empty();
  let score = partial_score(hits.saturating_sub(wrong.len()), total, max, correct);

  let mut details: Vec<ItemDetail> = expected
    .iter()
    .map(|id| {
      if selected.contains(id) {
        ItemDetail::new(*id, true)
      } else {
        ItemDetail::new(*id, false).with_feedback("missed")
      }
    })
    .collect();
  details.extend(wrong.iter().map(|id| ItemDetail::new(*id, false).with_feedback("not a correct option")));

  let mut feedback = count_feedback(hits, total);
  if !wrong.is_empty() {
    feedback.push_str(&format!(", {} incorrect selected", wrong.len()));
  }

  ValidationResult { correct, score, max_score: max, feedback, details: Some(details) }
}

/// Expected category for one decision item, plus the fix when the problem is fixable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionItem {
  pub expected: String,
  #[serde(default)] pub fix: Option<String>,
}

/// Binary or categorical decisions per item (e.g. "is this guard set
/// complete / overlapping / missing a case").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionKey {
  pub items: BTreeMap<String, DecisionItem>,
  /// Categories that, once chosen by the learner, require a fix selection.
  #[serde(default)] pub fix_required_for: BTreeSet<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionChoice {
  #[serde(default)] pub choice: Option<String>,
  #[serde(default)] pub fix: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionAnswer {
  #[serde(default)] pub choices: BTreeMap<String, DecisionChoice>,
}

/// Every item needs a choice; a chosen category listed in `fix_required_for`
/// also needs a fix. The rule looks at the learner's choice, not the
/// expected category, so the gate never reveals the answer.
pub(crate) fn decision_is_complete(key: &DecisionKey, answer: &DecisionAnswer) -> bool {
  key.items.keys().all(|id| match answer.choices.get(id) {
    Some(DecisionChoice { choice: Some(choice), fix }) => {
      !key.fix_required_for.contains(choice) || fix.is_some()
    }
    _ => false,
  })
}

pub fn decision(key: &DecisionKey, answer: &DecisionAnswer, max: u32) -> ValidationResult {
  let total = key.items.len();
  let mut hits = 0;
  let mut details = Vec::with_capacity(total);

  for (id, item) in &key.items {
    let given = answer.choices.get(id);
    let choice = given.and_then(|g| g.choice.as_deref());
    let detail = match choice {
      None => ItemDetail::new(id, false).with_feedback("not answered"),
      Some(c) if c != item.expected => ItemDetail::new(id, false).with_feedback("wrong category"),
      Some(_) => match &item.fix {
        Some(fix) if given.and_then(|g| g.fix.as_ref()) != Some(fix) => {
          ItemDetail::new(id, false).with_feedback("right problem, wrong fix")
        }
        _ => ItemDetail::new(id, true),
      },
    };
    if detail.correct {
      hits += 1;
    }
    details.push(detail);
  }

  let correct = total > 0 && hits == total;
  ValidationResult {
    correct,
    score: partial_score(hits, total, max, correct),
    max_score: max,
    feedback: count_feedback(hits, total),
    details: Some(details),
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedQuizKey {
  /// question id -> correct option id
  pub questions: BTreeMap<String, String>,
  pub time_limit_secs: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedQuizAnswer {
  #[serde(default)] pub responses: BTreeMap<String, String>,
  #[serde(default)] pub elapsed_secs: u32,
}

/// Unanswered questions count as wrong. The countdown lives in the UI;
/// overtime only shows up in the feedback text.
pub fn timed_quiz(key: &TimedQuizKey, answer: &TimedQuizAnswer, max: u32) -> ValidationResult {
  let total = key.questions.len();
  let mut hits = 0;
  let mut unanswered = 0;

  let details: Vec<ItemDetail> = key
    .questions
    .iter()
    .map(|(id, expected)| match answer.responses.get(id) {
      Some(given) if given == expected => {
        hits += 1;
        ItemDetail::new(id, true)
      }
      Some(_) => ItemDetail::new(id, false).with_feedback("wrong option"),
      None => {
        unanswered += 1;
        ItemDetail::new(id, false).with_feedback("not answered in time")
      }
    })
    .collect();

  let correct = total > 0 && hits == total;
  let mut feedback = count_feedback(hits, total);
  if unanswered > 0 {
    feedback.push_str(&format!(", {} unanswered", unanswered));
  }
  if answer.elapsed_secs > key.time_limit_secs {
    feedback.push_str(" (time limit exceeded)");
  }

  ValidationResult {
    correct,
    score: partial_score(hits, total, max, correct),
    max_score: max,
    feedback,
    details: Some(details),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn mc_key(ids: &[&str]) -> MultipleChoiceKey {
    MultipleChoiceKey { correct_ids: ids.iter().map(|s| s.to_string()).collect() }
  }

  fn mc_answer(ids: &[&str]) -> MultipleChoiceAnswer {
    MultipleChoiceAnswer { selected: ids.iter().map(|s| s.to_string()).collect() }
  }

  #[test]
  fn multiple_choice_single_correct_answer() {
    let r = multiple_choice(&mc_key(&["include"]), &mc_answer(&["include"]), 5);
    assert!(r.correct);
    assert_eq!(r.score, 5);
  }

  #[test]
  fn multiple_choice_wrong_answer_selected() {
    let r = multiple_choice(&mc_key(&["include"]), &mc_answer(&["extend"]), 5);
    assert!(!r.correct);
    assert_eq!(r.score, 0);
    let details = r.details.unwrap();
    assert_eq!(details.len(), 2);
    assert!(details.iter().all(|d| !d.correct));
  }

  #[test]
  fn multiple_choice_extra_selection_blocks_full_credit() {
    let r = multiple_choice(&mc_key(&["a", "b"]), &mc_answer(&["a", "b", "c"]), 4);
    assert!(!r.correct);
    assert_eq!(r.score, 2);
    assert!(r.feedback.contains("1 incorrect"));
  }

  #[test]
  fn multiple_choice_empty_selection_scores_zero() {
    let r = multiple_choice(&mc_key(&["a"]), &mc_answer(&[]), 5);
    assert_eq!((r.correct, r.score), (false, 0));
  }

  #[test]
  fn multiple_choice_empty_key_is_never_correct() {
    let r = multiple_choice(&mc_key(&[]), &mc_answer(&[]), 5);
    assert_eq!((r.correct, r.score), (false, 0));
  }

  fn guard_key() -> DecisionKey {
    let mut items = BTreeMap::new();
    items.insert("s1".into(), DecisionItem { expected: "complete".into(), fix: None });
    items.insert("s2".into(), DecisionItem { expected: "gap".into(), fix: Some("add_else".into()) });
    DecisionKey { items, fix_required_for: ["gap".to_string(), "overlap".to_string()].into() }
  }

  fn choice(c: &str, fix: Option<&str>) -> DecisionChoice {
    DecisionChoice { choice: Some(c.into()), fix: fix.map(str::to_string) }
  }

  #[test]
  fn decision_gate_follows_learner_choice() {
    let key = guard_key();
    let mut answer = DecisionAnswer::default();
    answer.choices.insert("s1".into(), choice("complete", None));
    assert!(!decision_is_complete(&key, &answer));

    // Chose a fixable category without a fix: still incomplete.
    answer.choices.insert("s2".into(), choice("overlap", None));
    assert!(!decision_is_complete(&key, &answer));

    answer.choices.insert("s2".into(), choice("overlap", Some("narrow_guard")));
    assert!(decision_is_complete(&key, &answer));

    // A non-fixable choice never needs a fix, even where the key expects one.
    answer.choices.insert("s2".into(), choice("complete", None));
    assert!(decision_is_complete(&key, &answer));
  }

  #[test]
  fn decision_requires_matching_fix() {
    let key = guard_key();
    let mut answer = DecisionAnswer::default();
    answer.choices.insert("s1".into(), choice("complete", None));
    answer.choices.insert("s2".into(), choice("gap", Some("remove_guard")));
    let r = decision(&key, &answer, 4);
    assert!(!r.correct);
    assert_eq!(r.score, 2);

    answer.choices.insert("s2".into(), choice("gap", Some("add_else")));
    let r = decision(&key, &answer, 4);
    assert!(r.correct);
    assert_eq!(r.score, 4);
  }

  #[test]
  fn timed_quiz_counts_unanswered_as_wrong() {
    let key = TimedQuizKey {
      questions: [("q1", "a"), ("q2", "b"), ("q3", "c"), ("q4", "d")]
        .into_iter()
        .map(|(q, a)| (q.to_string(), a.to_string()))
        .collect(),
      time_limit_secs: 60,
    };
    let mut answer = TimedQuizAnswer { elapsed_secs: 75, ..Default::default() };
    answer.responses.insert("q1".into(), "a".into());
    answer.responses.insert("q2".into(), "a".into());

    let r = timed_quiz(&key, &answer, 8);
    assert!(!r.correct);
    assert_eq!(r.score, 2);
    assert!(r.feedback.contains("2 unanswered"));
    assert!(r.feedback.contains("time limit exceeded"));
  }
}
