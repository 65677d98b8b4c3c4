//! Free-text archetypes: phrase categorisation and fill-in-the-blank.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{count_feedback, normalize_text, partial_score};
use crate::domain::{ItemDetail, ValidationResult};

/// Phrases hidden in a requirements text, each with its modelling category
/// (e.g. "customer" -> "class", "places an order" -> "operation").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextExtractionKey {
  pub phrases: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPhrase {
  pub phrase: String,
  pub category: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextExtractionAnswer {
  #[serde(default)] pub extracted: Vec<ExtractedPhrase>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blank {
  pub id: String,
  pub accepted: Vec<String>,
  #[serde(default)] pub case_sensitive: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillBlankKey {
  pub blanks: Vec<Blank>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillBlankAnswer {
  #[serde(default)] pub entries: BTreeMap<String, String>,
}

/// Phrases match case-insensitively after whitespace normalisation. The
/// first extraction of a phrase counts; repeats are ignored.
pub fn text_extraction(key: &TextExtractionKey, answer: &TextExtractionAnswer, max: u32) -> ValidationResult {
  let expected: BTreeMap<String, (&String, String)> = key
    .phrases
    .iter()
    .map(|(phrase, cat)| (normalize_text(phrase, false), (phrase, normalize_text(cat, false))))
    .collect();

  let mut seen = BTreeSet::new();
  let mut found: BTreeMap<String, bool> = BTreeMap::new();
  let mut stray = Vec::new();

  for item in &answer.extracted {
    let phrase = normalize_text(&item.phrase, false);
    if !seen.insert(phrase.clone()) {
      continue;
    }
    match expected.get(&phrase) {
      Some((_, cat)) => {
        found.insert(phrase, *cat == normalize_text(&item.category, false));
      }
      None => stray.push(item.phrase.trim().to_string()),
    }
  }

  let total = expected.len();
  let mut hits = 0;
  let mut details: Vec<ItemDetail> = expected
    .iter()
    .map(|(norm, (original, _))| match found.get(norm) {
      Some(true) => {
        hits += 1;
        ItemDetail::new(*original, true)
      }
      Some(false) => ItemDetail::new(*original, false).with_feedback("wrong category"),
      None => ItemDetail::new(*original, false).with_feedback("missed"),
    })
    .collect();
  let miscategorised = found.values().filter(|ok| !**ok).count();
  details.extend(stray.iter().map(|p| ItemDetail::new(p, false).with_feedback("not a relevant phrase")));

  let correct = total > 0 && hits == total && stray.is_empty();
  let mut feedback = count_feedback(hits, total);
  if miscategorised > 0 {
    feedback.push_str(&format!(", {} in the wrong category", miscategorised));
  }
  if !stray.is_empty() {
    feedback.push_str(&format!(", {} irrelevant", stray.len()));
  }

  ValidationResult {
    correct,
    score: partial_score(hits, total, max, correct),
    max_score: max,
    feedback,
    details: Some(details),
  }
}

pub fn fill_blank(key: &FillBlankKey, answer: &FillBlankAnswer, max: u32) -> ValidationResult {
  let total = key.blanks.len();
  let details: Vec<ItemDetail> = key
    .blanks
    .iter()
    .map(|blank| {
      let entry = answer.entries.get(&blank.id).map(|e| normalize_text(e, blank.case_sensitive));
      match entry {
        Some(e) if e.is_empty() => ItemDetail::new(&blank.id, false).with_feedback("empty"),
        Some(e) => {
          let ok = blank.accepted.iter().any(|a| normalize_text(a, blank.case_sensitive) == e);
          if ok { ItemDetail::new(&blank.id, true) } else { ItemDetail::new(&blank.id, false) }
        }
        None => ItemDetail::new(&blank.id, false).with_feedback("empty"),
      }
    })
    .collect();
  let hits = details.iter().filter(|d| d.correct).count();

  let correct = total > 0 && hits == total;
  ValidationResult {
    correct,
    score: partial_score(hits, total, max, correct),
    max_score: max,
    feedback: count_feedback(hits, total),
    details: Some(details),
  }
}
