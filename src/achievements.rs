//! Badges derived from progress.
//!
//! Eligibility is recomputed from scratch on every evaluation; badges that
//! become eligible are stamped once and never revoked.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::domain::Chapter;
use crate::persistence::{load_snapshot, save_snapshot, KeyValueStore};
use crate::progress::ProgressState;

pub const FIRST_STEPS: &str = "first_steps";
pub const PERFECTIONIST: &str = "perfectionist";
pub const UML_MASTER: &str = "uml_master";

/// Static badge definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AchievementDef {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

pub const CATALOG: [AchievementDef; 8] = [
    AchievementDef {
        id: FIRST_STEPS,
        title: "First Steps",
        description: "Complete your first exercise.",
        icon: "🎯",
    },
    AchievementDef {
        id: PERFECTIONIST,
        title: "Perfectionist",
        description: "Finish an exercise with full points.",
        icon: "💯",
    },
    AchievementDef {
        id: "class_master",
        title: "Class Master",
        description: "Complete every class diagram exercise.",
        icon: "🏛️",
    },
    AchievementDef {
        id: "sequence_master",
        title: "Sequence Master",
        description: "Complete every sequence diagram exercise.",
        icon: "⏱️",
    },
    AchievementDef {
        id: "state_master",
        title: "State Master",
        description: "Complete every state diagram exercise.",
        icon: "🔄",
    },
    AchievementDef {
        id: "activity_master",
        title: "Activity Master",
        description: "Complete every activity diagram exercise.",
        icon: "🔀",
    },
    AchievementDef {
        id: "use_case_master",
        title: "Use-Case Master",
        description: "Complete every use-case diagram exercise.",
        icon: "👤",
    },
    AchievementDef {
        id: UML_MASTER,
        title: "UML Master",
        description: "Master every chapter.",
        icon: "🏆",
    },
];

pub fn mastery_badge(chapter: Chapter) -> &'static str {
    match chapter {
        Chapter::Class => "class_master",
        Chapter::Sequence => "sequence_master",
        Chapter::State => "state_master",
        Chapter::Activity => "activity_master",
        Chapter::UseCase => "use_case_master",
    }
}

pub fn definition(id: &str) -> Option<&'static AchievementDef> {
    CATALOG.iter().find(|d| d.id == id)
}

/// Expected completed-exercise count per chapter for its mastery badge.
/// A chapter without a target (or a zero target) cannot be mastered.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterTargets(BTreeMap<Chapter, usize>);

impl ChapterTargets {
    pub fn get(&self, chapter: Chapter) -> usize {
        self.0.get(&chapter).copied().unwrap_or(0)
    }

    pub fn set(&mut self, chapter: Chapter, target: usize) {
        self.0.insert(chapter, target);
    }

    pub fn is_mastered(&self, chapter: Chapter, progress: &ProgressState) -> bool {
        let target = self.get(chapter);
        target > 0 && progress.completed_in(chapter) >= target
    }
}

/// Badge ids whose conditions hold for `progress`, in catalogue order.
pub fn eligible(progress: &ProgressState, targets: &ChapterTargets) -> Vec<&'static str> {
    let mut out = Vec::new();
    if progress.all_exercises().any(|e| e.completed) {
        out.push(FIRST_STEPS);
    }
    if progress.all_exercises().any(|e| e.completed && e.score == e.max_score) {
        out.push(PERFECTIONIST);
    }
    let mut all_mastered = true;
    for chapter in Chapter::ALL {
        if targets.is_mastered(chapter, progress) {
            out.push(mastery_badge(chapter));
        } else {
            all_mastered = false;
        }
    }
    if all_mastered {
        out.push(UML_MASTER);
    }
    out
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementState {
    #[serde(default)]
    unlocked: BTreeMap<String, DateTime<Utc>>,
}

impl AchievementState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unlocked_at(&self, id: &str) -> Option<DateTime<Utc>> {
        self.unlocked.get(id).copied()
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.contains_key(id)
    }

    /// Unlock every newly eligible badge at `now`; returns the ids unlocked
    /// by this call. Already-unlocked badges keep their original timestamp.
    pub fn evaluate(&mut self, progress: &ProgressState, targets: &ChapterTargets, now: DateTime<Utc>) -> Vec<String> {
        let mut newly = Vec::new();
        for id in eligible(progress, targets) {
            if !self.unlocked.contains_key(id) {
                self.unlocked.insert(id.to_string(), now);
                newly.push(id.to_string());
            }
        }
        newly
    }
}

/// Badge plus unlock state, as shown to clients.
#[derive(Clone, Debug, Serialize)]
pub struct AchievementView {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Persisted badges of one learner, plus a transient queue of fresh unlocks
/// for toast-style announcements.
pub struct AchievementStore {
    state: AchievementState,
    backend: Arc<dyn KeyValueStore>,
    key: String,
    notifications: VecDeque<String>,
}

impl AchievementStore {
    #[instrument(level = "debug", skip(backend))]
    pub fn load(backend: Arc<dyn KeyValueStore>, key: String) -> Self {
        let state: AchievementState = load_snapshot(backend.as_ref(), &key);
        Self { state, backend, key, notifications: VecDeque::new() }
    }

    pub fn state(&self) -> &AchievementState {
        &self.state
    }

    #[instrument(level = "debug", skip(self, progress, targets), fields(key = %self.key))]
    pub fn evaluate(&mut self, progress: &ProgressState, targets: &ChapterTargets) -> Vec<String> {
        let newly = self.state.evaluate(progress, targets, Utc::now());
        if !newly.is_empty() {
            save_snapshot(self.backend.as_ref(), &self.key, &self.state);
            for id in &newly {
                info!(target: "achievement", key = %self.key, %id, "Achievement unlocked");
                self.notifications.push_back(id.clone());
            }
        }
        newly
    }

    /// Pending unlock announcements, oldest first. Not persisted.
    pub fn drain_notifications(&mut self) -> Vec<String> {
        self.notifications.drain(..).collect()
    }

    pub fn views(&self) -> Vec<AchievementView> {
        CATALOG.iter().map(|d| self.view_of(d)).collect()
    }

    /// View of a single badge; `None` for ids outside the catalogue.
    pub fn view(&self, id: &str) -> Option<AchievementView> {
        definition(id).map(|d| self.view_of(d))
    }

    fn view_of(&self, d: &AchievementDef) -> AchievementView {
        AchievementView {
            id: d.id,
            title: d.title,
            description: d.description,
            icon: d.icon,
            unlocked_at: self.state.unlocked_at(d.id),
        }
    }
}
