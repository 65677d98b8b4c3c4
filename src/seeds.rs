//! Built-in exercises. They guarantee the app is useful without an external
//! bank and cover every chapter and every archetype.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{Chapter, ExerciseDefinition};
use crate::validate::{
  AnswerKey, Blank, DecisionItem, DecisionKey, FillBlankKey, HotspotKey, MultipleChoiceKey,
  PaintKey, Region, SequenceKey, TextExtractionKey, TimedQuizKey, ZoneMatchingKey,
};

fn pairs(items: &[(&str, &str)]) -> BTreeMap<String, String> {
  items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn strings(items: &[&str]) -> Vec<String> {
  items.iter().map(|s| s.to_string()).collect()
}

fn exercise(id: &str, chapter: Chapter, title: &str, prompt: &str, max_points: u32, hints: &[&str], key: AnswerKey) -> ExerciseDefinition {
  ExerciseDefinition {
    id: id.into(),
    version: 1,
    chapter,
    title: title.into(),
    prompt: prompt.into(),
    max_points,
    hints: strings(hints),
    key,
  }
}

pub fn seed_exercises() -> Vec<ExerciseDefinition> {
  vec![
    exercise(
      "cls-extract-nouns",
      Chapter::Class,
      "Find the classes",
      "Mark the phrases of the shop requirements that become classes, attributes or operations.",
      6,
      &["Nouns tend to become classes.", "Verbs tend to become operations."],
      AnswerKey::TextExtraction(TextExtractionKey {
        phrases: pairs(&[
          ("customer", "class"),
          ("order", "class"),
          ("product", "class"),
          ("delivery address", "attribute"),
          ("places an order", "operation"),
          ("cancels", "operation"),
        ]),
      }),
    ),
    exercise(
      "cls-relationships",
      Chapter::Class,
      "Relationship kinds",
      "Drag each relationship into the zone that names its kind.",
      8,
      &["A filled diamond means the part cannot live without the whole."],
      AnswerKey::ZoneMatching(ZoneMatchingKey {
        correct_mapping: pairs(&[
          ("House-Room", "composition"),
          ("Team-Player", "aggregation"),
          ("Car-Vehicle", "inheritance"),
          ("Teacher-Course", "association"),
        ]),
      }),
    ),
    exercise(
      "seq-login-order",
      Chapter::Sequence,
      "Login message order",
      "Put the messages of the login interaction in order.",
      5,
      &["The controller talks to the database before answering the browser."],
      AnswerKey::Sequence(SequenceKey {
        correct_order: strings(&["submitCredentials", "validate", "findUser", "userRecord", "loginResult"]),
      }),
    ),
    exercise(
      "seq-fragments",
      Chapter::Sequence,
      "Combined fragments",
      "Fill in the fragment operator for each situation.",
      3,
      &["Repetition uses a loop, alternatives use alt."],
      AnswerKey::FillBlank(FillBlankKey {
        blanks: vec![
          Blank { id: "retry".into(), accepted: strings(&["loop"]), case_sensitive: false },
          Blank { id: "if-else".into(), accepted: strings(&["alt"]), case_sensitive: false },
          Blank { id: "optional".into(), accepted: strings(&["opt"]), case_sensitive: false },
        ],
      }),
    ),
    exercise(
      "state-find-pseudostates",
      Chapter::State,
      "Initial and final states",
      "Click the initial pseudostate and the final state in the traffic light diagram.",
      4,
      &["The initial pseudostate is a filled circle."],
      AnswerKey::Hotspot(HotspotKey {
        regions: vec![
          Region { id: "initial".into(), x: 20.0, y: 20.0, width: 24.0, height: 24.0 },
          Region { id: "final".into(), x: 420.0, y: 260.0, width: 28.0, height: 28.0 },
        ],
        penalty_per_miss: 1,
      }),
    ),
    exercise(
      "state-quiz",
      Chapter::State,
      "State diagram speed quiz",
      "Answer as many questions as you can before time runs out.",
      4,
      &[],
      AnswerKey::TimedQuiz(TimedQuizKey {
        questions: pairs(&[
          ("entry-action", "on_enter"),
          ("guard-syntax", "brackets"),
          ("history", "remembers_substate"),
          ("self-transition", "exits_and_reenters"),
        ]),
        time_limit_secs: 60,
      }),
    ),
    exercise(
      "act-guards",
      Chapter::Activity,
      "Check the guards",
      "For each decision node decide whether its guards are complete, overlap or leave a gap, and pick a fix.",
      6,
      &["Guards on one decision must be mutually exclusive and cover every case."],
      AnswerKey::Decision(DecisionKey {
        items: [
          ("age-check", DecisionItem { expected: "complete".into(), fix: None }),
          ("stock-check", DecisionItem { expected: "gap".into(), fix: Some("add_else".into()) }),
          ("discount", DecisionItem { expected: "overlap".into(), fix: Some("tighten_bounds".into()) }),
        ]
        .into_iter()
        .map(|(id, item)| (id.to_string(), item))
        .collect(),
        fix_required_for: ["gap", "overlap"].into_iter().map(String::from).collect::<BTreeSet<_>>(),
      }),
    ),
    exercise(
      "act-swimlanes",
      Chapter::Activity,
      "Who does what",
      "Paint each action with the colour of the swimlane responsible for it.",
      4,
      &["Payment is handled by the bank, not the shop."],
      AnswerKey::Paint(PaintKey {
        expected: pairs(&[
          ("choose items", "customer"),
          ("authorise payment", "bank"),
          ("pack parcel", "warehouse"),
          ("confirm order", "shop"),
        ]),
      }),
    ),
    exercise(
      "uc-include",
      Chapter::UseCase,
      "Include or extend",
      "Checkout always verifies the cart. Which relationship connects them?",
      5,
      &["Mandatory behaviour is always included."],
      AnswerKey::MultipleChoice(MultipleChoiceKey { correct_ids: strings(&["include"]) }),
    ),
    exercise(
      "uc-actors",
      Chapter::UseCase,
      "Spot the actors",
      "Select every element that is an actor of the library system.",
      3,
      &["Actors sit outside the system boundary."],
      AnswerKey::MultipleChoice(MultipleChoiceKey {
        correct_ids: strings(&["librarian", "member", "payment_provider"]),
      }),
    ),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn seeds_cover_every_chapter_and_archetype() {
    let seeds = seed_exercises();
    let chapters: HashSet<Chapter> = seeds.iter().map(|e| e.chapter).collect();
    assert_eq!(chapters.len(), Chapter::ALL.len());
    let kinds: HashSet<&str> = seeds.iter().map(|e| e.key.kind()).collect();
    assert_eq!(kinds.len(), 9);
  }

  #[test]
  fn seed_ids_are_unique() {
    let seeds = seed_exercises();
    let ids: HashSet<&str> = seeds.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids.len(), seeds.len());
  }
}
