//! Progress bookkeeping: best-ever result per (chapter, exercise).
//!
//! `ProgressState` is the pure part: a serialisable snapshot plus a reducer
//! (`apply`) that turns an action into the next state. `ProgressStore` wraps
//! it with the persistence side effect (snapshot after every mutation).

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::domain::Chapter;
use crate::persistence::{load_snapshot, save_snapshot, KeyValueStore};

/// Recorded result for one exercise, valid for one content `version`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseProgress {
    pub version: u32,
    pub completed: bool,
    /// Best score ever achieved at this version.
    pub score: u32,
    pub max_score: u32,
    pub attempts: u32,
    pub last_attempt: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterProgress {
    #[serde(default)]
    pub theory_read: bool,
    #[serde(default)]
    pub exercises: BTreeMap<String, ExerciseProgress>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    #[serde(default)]
    chapters: BTreeMap<Chapter, ChapterProgress>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressAction {
    MarkTheoryRead {
        chapter: Chapter,
    },
    SaveExerciseResult {
        chapter: Chapter,
        exercise_id: String,
        version: u32,
        score: u32,
        max_score: u32,
    },
    ResetExercise {
        chapter: Chapter,
        exercise_id: String,
    },
    ResetAll,
    /// Drop records whose version differs from the current catalogue version.
    /// Ids missing from `current` are left alone.
    DropStale {
        current: BTreeMap<String, u32>,
    },
}

/// Aggregate view of one chapter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChapterSummary {
    pub chapter: Chapter,
    pub theory_read: bool,
    pub completed: usize,
    pub recorded: usize,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one action. Chapter records are created lazily on first write.
    pub fn apply(&mut self, action: ProgressAction, now: DateTime<Utc>) {
        match action {
            ProgressAction::MarkTheoryRead { chapter } => {
                self.chapters.entry(chapter).or_default().theory_read = true;
            }
            ProgressAction::SaveExerciseResult { chapter, exercise_id, version, score, max_score } => {
                let score = if score > max_score {
                    warn!(target: "progress", %chapter, %exercise_id, score, max_score, "Score above maximum; clamping");
                    max_score
                } else {
                    score
                };
                // A zero-point exercise has nothing to complete.
                let perfect = max_score > 0 && score == max_score;
                let exercises = &mut self.chapters.entry(chapter).or_default().exercises;
                // A changed maximum means changed content, same as a version bump.
                match exercises
                    .get_mut(&exercise_id)
                    .filter(|p| p.version == version && p.max_score == max_score)
                {
                    Some(prev) => {
                        prev.completed = prev.completed || perfect;
                        prev.score = prev.score.max(score);
                        prev.max_score = max_score;
                        prev.attempts = prev.attempts.saturating_add(1);
                        prev.last_attempt = now;
                    }
                    None => {
                        if let Some(stale) = exercises.get(&exercise_id) {
                            debug!(target: "progress", %chapter, %exercise_id, old = stale.version, new = version, old_max = stale.max_score, new_max = max_score, "Exercise content changed; discarding old progress");
                        }
                        exercises.insert(
                            exercise_id,
                            ExerciseProgress {
                                version,
                                completed: perfect,
                                score,
                                max_score,
                                attempts: 1,
                                last_attempt: now,
                            },
                        );
                    }
                }
            }
            ProgressAction::ResetExercise { chapter, exercise_id } => {
                if let Some(ch) = self.chapters.get_mut(&chapter) {
                    ch.exercises.remove(&exercise_id);
                }
            }
            ProgressAction::ResetAll => self.chapters.clear(),
            ProgressAction::DropStale { current } => {
                for (chapter, ch) in self.chapters.iter_mut() {
                    ch.exercises.retain(|id, p| match current.get(id) {
                        Some(&v) if v != p.version => {
                            debug!(target: "progress", %chapter, exercise_id = %id, old = p.version, new = v, "Dropping stale progress");
                            false
                        }
                        _ => true,
                    });
                }
            }
        }
    }

    pub fn chapter(&self, chapter: Chapter) -> Option<&ChapterProgress> {
        self.chapters.get(&chapter)
    }

    pub fn chapters(&self) -> impl Iterator<Item = (&Chapter, &ChapterProgress)> {
        self.chapters.iter()
    }

    pub fn is_theory_read(&self, chapter: Chapter) -> bool {
        self.chapters.get(&chapter).map(|c| c.theory_read).unwrap_or(false)
    }

    /// Point lookup, regardless of version.
    pub fn exercise(&self, chapter: Chapter, exercise_id: &str) -> Option<&ExerciseProgress> {
        self.chapters.get(&chapter)?.exercises.get(exercise_id)
    }

    /// Point lookup that hides records made against another content version.
    pub fn current_exercise(&self, chapter: Chapter, exercise_id: &str, version: u32) -> Option<&ExerciseProgress> {
        self.exercise(chapter, exercise_id).filter(|p| p.version == version)
    }

    pub fn completed_in(&self, chapter: Chapter) -> usize {
        self.chapters
            .get(&chapter)
            .map(|c| c.exercises.values().filter(|e| e.completed).count())
            .unwrap_or(0)
    }

    pub fn chapter_summary(&self, chapter: Chapter) -> ChapterSummary {
        let ch = self.chapters.get(&chapter);
        ChapterSummary {
            chapter,
            theory_read: ch.map(|c| c.theory_read).unwrap_or(false),
            completed: self.completed_in(chapter),
            recorded: ch.map(|c| c.exercises.len()).unwrap_or(0),
        }
    }

    /// Completed / recorded across all chapters, as a percentage. Zero when
    /// nothing has been recorded yet.
    pub fn overall_percentage(&self) -> f64 {
        let (completed, total) = self
            .chapters
            .values()
            .flat_map(|c| c.exercises.values())
            .fold((0usize, 0usize), |(done, all), e| (done + e.completed as usize, all + 1));
        if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64 * 100.0
        }
    }

    /// Every recorded exercise, across chapters.
    pub fn all_exercises(&self) -> impl Iterator<Item = &ExerciseProgress> {
        self.chapters.values().flat_map(|c| c.exercises.values())
    }
}

/// Persisted progress of one learner.
pub struct ProgressStore {
    state: ProgressState,
    backend: Arc<dyn KeyValueStore>,
    key: String,
}

impl ProgressStore {
    /// Load the snapshot under `key` (empty state if absent or unreadable).
    #[instrument(level = "debug", skip(backend))]
    pub fn load(backend: Arc<dyn KeyValueStore>, key: String) -> Self {
        let state: ProgressState = load_snapshot(backend.as_ref(), &key);
        Self { state, backend, key }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    fn dispatch(&mut self, action: ProgressAction) {
        self.state.apply(action, Utc::now());
        save_snapshot(self.backend.as_ref(), &self.key, &self.state);
    }

    #[instrument(level = "debug", skip(self), fields(key = %self.key))]
    pub fn mark_theory_read(&mut self, chapter: Chapter) {
        self.dispatch(ProgressAction::MarkTheoryRead { chapter });
    }

    #[instrument(level = "info", skip(self), fields(key = %self.key))]
    pub fn save_exercise_result(&mut self, chapter: Chapter, exercise_id: &str, version: u32, score: u32, max_score: u32) {
        self.dispatch(ProgressAction::SaveExerciseResult {
            chapter,
            exercise_id: exercise_id.to_string(),
            version,
            score,
            max_score,
        });
        if let Some(p) = self.state.exercise(chapter, exercise_id) {
            info!(target: "progress", %chapter, %exercise_id, best = p.score, attempts = p.attempts, completed = p.completed, "Result recorded");
        }
    }

    #[instrument(level = "info", skip(self), fields(key = %self.key))]
    pub fn reset_exercise(&mut self, chapter: Chapter, exercise_id: &str) {
        self.dispatch(ProgressAction::ResetExercise { chapter, exercise_id: exercise_id.to_string() });
    }

    #[instrument(level = "info", skip(self), fields(key = %self.key))]
    pub fn reset_all(&mut self) {
        self.dispatch(ProgressAction::ResetAll);
    }

    /// Forget results recorded against older content. Only writes a snapshot
    /// when something was dropped; returns the number of dropped records.
    #[instrument(level = "debug", skip(self, current), fields(key = %self.key))]
    pub fn drop_stale(&mut self, current: &BTreeMap<String, u32>) -> usize {
        let before = self.state.all_exercises().count();
        let mut next = self.state.clone();
        next.apply(ProgressAction::DropStale { current: current.clone() }, Utc::now());
        let dropped = before - next.all_exercises().count();
        if dropped > 0 {
            self.state = next;
            save_snapshot(self.backend.as_ref(), &self.key, &self.state);
            info!(target: "progress", dropped, "Stale exercise progress discarded");
        }
        dropped
    }
}
