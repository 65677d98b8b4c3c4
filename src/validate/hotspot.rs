//! Clickable-region archetype.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{count_feedback, partial_score};
use crate::domain::{ItemDetail, ValidationResult};

/// Axis-aligned target region in diagram coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
  pub id: String,
  pub x: f64,
  pub y: f64,
  pub width: f64,
  pub height: f64,
}

impl Region {
  pub fn contains(&self, p: &Point) -> bool {
    p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HotspotKey {
  pub regions: Vec<Region>,
  /// Points subtracted per click that hits no region.
  #[serde(default)] pub penalty_per_miss: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HotspotAnswer {
  #[serde(default)] pub clicks: Vec<Point>,
}

pub fn hotspot(key: &HotspotKey, answer: &HotspotAnswer, max: u32) -> ValidationResult {
  let mut found: BTreeSet<&str> = BTreeSet::new();
  let mut false_positives: u32 = 0;

  for click in &answer.clicks {
    match key.regions.iter().find(|r| r.contains(click)) {
      Some(region) => {
        found.insert(region.id.as_str());
      }
      None => false_positives += 1,
    }
  }

  let total = key.regions.len();
  let hits = key.regions.iter().filter(|r| found.contains(r.id.as_str())).count();
  let correct = total > 0 && hits == total && false_positives == 0;

  let raw = partial_score(hits, total, max, correct);
  let penalty = key.penalty_per_miss.saturating_mul(false_positives);
  let score = raw.saturating_sub(penalty).min(max);

  let details: Vec<ItemDetail> = key
    .regions
    .iter()
    .map(|r| {
      if found.contains(r.id.as_str()) {
        ItemDetail::new(&r.id, true)
      } else {
        ItemDetail::new(&r.id, false).with_feedback("not found")
      }
    })
    .collect();

  let mut feedback = count_feedback(hits, total);
  if false_positives > 0 {
    feedback.push_str(&format!(", {} clicks outside any target", false_positives));
  }

  ValidationResult { correct, score, max_score: max, feedback, details: Some(details) }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(penalty: u32) -> HotspotKey {
    HotspotKey {
      regions: vec![
        Region { id: "initial".into(), x: 0.0, y: 0.0, width: 10.0, height: 10.0 },
        Region { id: "final".into(), x: 100.0, y: 100.0, width: 10.0, height: 10.0 },
      ],
      penalty_per_miss: penalty,
    }
  }

  fn clicks(points: &[(f64, f64)]) -> HotspotAnswer {
    HotspotAnswer { clicks: points.iter().map(|&(x, y)| Point { x, y }).collect() }
  }

  #[test]
  fn all_regions_found_without_misses() {
    let r = hotspot(&key(1), &clicks(&[(5.0, 5.0), (105.0, 101.0)]), 4);
    assert!(r.correct);
    assert_eq!(r.score, 4);
  }

  #[test]
  fn repeated_clicks_on_found_region_are_free() {
    let r = hotspot(&key(2), &clicks(&[(5.0, 5.0), (6.0, 6.0)]), 4);
    assert!(!r.correct);
    assert_eq!(r.score, 2);
  }

  #[test]
  fn misses_cost_penalty_and_clamp_at_zero() {
    let r = hotspot(&key(1), &clicks(&[(5.0, 5.0), (50.0, 50.0)]), 4);
    assert_eq!(r.score, 1);

    let r = hotspot(&key(5), &clicks(&[(5.0, 5.0), (50.0, 50.0)]), 4);
    assert_eq!(r.score, 0);
    assert!(r.feedback.contains("1 clicks outside"));
  }

  #[test]
  fn no_penalty_still_blocks_full_score_on_miss() {
    let r = hotspot(&key(0), &clicks(&[(5.0, 5.0), (105.0, 105.0), (50.0, 50.0)]), 4);
    assert!(!r.correct);
    assert_eq!(r.score, 3);
  }
}
