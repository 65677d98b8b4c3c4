//! Domain models used by the backend: chapters, exercise definitions, validation results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validate::AnswerKey;

/// One chapter per UML diagram type taught.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chapter {
  Class,
  Sequence,
  State,
  Activity,
  UseCase,
}

impl Chapter {
  /// Teaching order.
  pub const ALL: [Chapter; 5] = [
    Chapter::Class,
    Chapter::Sequence,
    Chapter::State,
    Chapter::Activity,
    Chapter::UseCase,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Chapter::Class => "class",
      Chapter::Sequence => "sequence",
      Chapter::State => "state",
      Chapter::Activity => "activity",
      Chapter::UseCase => "use_case",
    }
  }

  pub fn title(&self) -> &'static str {
    match self {
      Chapter::Class => "Class Diagrams",
      Chapter::Sequence => "Sequence Diagrams",
      Chapter::State => "State Diagrams",
      Chapter::Activity => "Activity Diagrams",
      Chapter::UseCase => "Use-Case Diagrams",
    }
  }
}

impl fmt::Display for Chapter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Chapter {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Chapter::ALL
      .into_iter()
      .find(|c| c.as_str() == s)
      .ok_or_else(|| format!("unknown chapter '{}'", s))
  }
}

/// Author-provided exercise. Immutable at runtime; bump `version` when the
/// content changes so stale progress is discarded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExerciseDefinition {
  pub id: String,
  pub version: u32,
  pub chapter: Chapter,
  #[serde(default)] pub title: String,
  #[serde(default)] pub prompt: String,
  pub max_points: u32,
  #[serde(default)] pub hints: Vec<String>,
  pub key: AnswerKey,
}

/// Outcome of grading one submission.
///
/// `0 <= score <= max_score` always holds, and every validator in this crate
/// keeps `correct` true exactly when `score == max_score`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
  pub correct: bool,
  pub score: u32,
  pub max_score: u32,
  pub feedback: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub details: Option<Vec<ItemDetail>>,
}

/// Per-item breakdown, in the order the exercise lists its items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetail {
  pub item_id: String,
  pub correct: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub feedback: Option<String>,
}

impl ItemDetail {
  pub fn new(item_id: impl Into<String>, correct: bool) -> Self {
    Self { item_id: item_id.into(), correct, feedback: None }
  }

  pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
    self.feedback = Some(feedback.into());
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn chapter_parses_its_own_display_form() {
    for c in Chapter::ALL {
      assert_eq!(c.to_string().parse::<Chapter>(), Ok(c));
    }
    assert!("deployment".parse::<Chapter>().is_err());
  }

  #[test]
  fn chapter_serializes_snake_case() {
    let json = serde_json::to_string(&Chapter::UseCase).unwrap();
    assert_eq!(json, "\"use_case\"");
  }
}
