//! Matching archetypes: drag-to-zone, ordered sequences, paint-by-category.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{count_feedback, partial_score};
use crate::domain::{ItemDetail, ValidationResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneMatchingKey {
  /// item id -> zone id
  pub correct_mapping: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneMatchingAnswer {
  #[serde(default)] pub placements: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceKey {
  pub correct_order: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceAnswer {
  #[serde(default)] pub order: Vec<String>,
}

/// Elements that must be painted with a category colour. Elements missing
/// from `expected` must stay unpainted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaintKey {
  pub expected: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaintAnswer {
  #[serde(default)] pub painted: BTreeMap<String, String>,
}

pub fn zone_matching(key: &ZoneMatchingKey, answer: &ZoneMatchingAnswer, max: u32) -> ValidationResult {
  grade_mapping(&key.correct_mapping, &answer.placements, max, "not part of this diagram")
}

pub fn paint(key: &PaintKey, answer: &PaintAnswer, max: u32) -> ValidationResult {
  grade_mapping(&key.expected, &answer.painted, max, "should stay unpainted")
}

fn grade_mapping(
  expected: &BTreeMap<String, String>,
  given: &BTreeMap<String, String>,
  max: u32,
  extra_note: &str,
) -> ValidationResult {
  let total = expected.len();
  let mut hits = 0;
  let mut details = Vec::with_capacity(total);

  for (item, target) in expected {
    let detail = match given.get(item) {
      Some(placed) if placed == target => {
        hits += 1;
        ItemDetail::new(item, true)
      }
      Some(placed) => ItemDetail::new(item, false).with_feedback(format!("placed in '{}'", placed)),
      None => ItemDetail::new(item, false).with_feedback("not placed"),
    };
    details.push(detail);
  }

  let extras: Vec<&String> = given.keys().filter(|item| !expected.contains_key(*item)).collect();
  details.extend(extras.iter().map(|item| ItemDetail::new(*item, false).with_feedback(extra_note)));

  let correct = total > 0 && hits == total && extras.is_empty();
  let mut feedback = count_feedback(hits, total);
  if !extras.is_empty() {
    feedback.push_str(&format!(", {} extra", extras.len()));
  }

  ValidationResult {
    correct,
    score: partial_score(hits, total, max, correct),
    max_score: max,
    feedback,
    details: Some(details),
  }
}

/// Position-by-position comparison. Full credit only when every position
/// matches and the lengths agree.
pub fn sequence(key: &SequenceKey, answer: &SequenceAnswer, max: u32) -> ValidationResult {
  let total = key.correct_order.len();
  let details: Vec<ItemDetail> = key
    .correct_order
    .iter()
    .enumerate()
    .map(|(pos, expected)| match answer.order.get(pos) {
      Some(given) if given == expected => ItemDetail::new(expected, true),
      Some(given) => ItemDetail::new(expected, false)
        .with_feedback(format!("position {} holds '{}'", pos + 1, given)),
      None => ItemDetail::new(expected, false).with_feedback(format!("position {} is empty", pos + 1)),
    })
    .collect();
  let hits = details.iter().filter(|d| d.correct).count();

  let correct = total > 0 && hits == total && answer.order.len() == total;
  ValidationResult {
    correct,
    score: partial_score(hits, total, max, correct),
    max_score: max,
    feedback: format!("{} of {} positions correct", hits, total),
    details: Some(details),
  }
}
