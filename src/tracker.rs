//! One learner's persisted stores, wired together: every recorded result
//! is followed by an achievement evaluation.

use std::{collections::BTreeMap, sync::Arc};

use tracing::instrument;

use crate::achievements::{AchievementStore, ChapterTargets};
use crate::domain::Chapter;
use crate::persistence::{learner_key, KeyValueStore, ACHIEVEMENTS_NAMESPACE, PROGRESS_NAMESPACE};
use crate::progress::ProgressStore;

pub struct Tracker {
  progress: ProgressStore,
  achievements: AchievementStore,
  targets: ChapterTargets,
}

impl Tracker {
  /// Load both snapshots for `learner` from `backend`.
  pub fn load(backend: Arc<dyn KeyValueStore>, learner: &str, targets: ChapterTargets) -> Self {
    Self {
      progress: ProgressStore::load(backend.clone(), learner_key(learner, PROGRESS_NAMESPACE)),
      achievements: AchievementStore::load(backend, learner_key(learner, ACHIEVEMENTS_NAMESPACE)),
      targets,
    }
  }

  pub fn progress(&self) -> &ProgressStore {
    &self.progress
  }

  pub fn achievements(&self) -> &AchievementStore {
    &self.achievements
  }

  pub fn achievements_mut(&mut self) -> &mut AchievementStore {
    &mut self.achievements
  }

  pub fn targets(&self) -> &ChapterTargets {
    &self.targets
  }

  /// Save the result, then evaluate badges. Returns newly unlocked badge ids.
  #[instrument(level = "debug", skip(self))]
  pub fn record_result(&mut self, chapter: Chapter, exercise_id: &str, version: u32, score: u32, max_score: u32) -> Vec<String> {
    self.progress.save_exercise_result(chapter, exercise_id, version, score, max_score);
    self.achievements.evaluate(self.progress.state(), &self.targets)
  }

  pub fn mark_theory_read(&mut self, chapter: Chapter) {
    self.progress.mark_theory_read(chapter);
  }

  pub fn reset_exercise(&mut self, chapter: Chapter, exercise_id: &str) {
    self.progress.reset_exercise(chapter, exercise_id);
  }

  /// Forget results recorded against other content versions.
  pub fn drop_stale(&mut self, current: &BTreeMap<String, u32>) -> usize {
    self.progress.drop_stale(current)
  }

  /// Clears progress only; unlocked badges stay unlocked.
  pub fn reset_all(&mut self) {
    self.progress.reset_all();
  }
}
