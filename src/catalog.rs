//! Exercise catalogue: every definition the service knows, indexed by id and chapter.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use tracing::{info, warn};

use crate::achievements::ChapterTargets;
use crate::domain::{Chapter, ExerciseDefinition};

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    by_id: HashMap<String, Arc<ExerciseDefinition>>,
    by_chapter: BTreeMap<Chapter, Vec<String>>,
}

impl Catalog {
    /// Bank entries first; seeds never overwrite an id the bank already uses.
    pub fn build(bank: Vec<ExerciseDefinition>, seeds: Vec<ExerciseDefinition>) -> Self {
        let mut catalog = Self::default();
        for ex in bank {
            if catalog.by_id.contains_key(&ex.id) {
                warn!(target: "uml_trainer", id = %ex.id, "Duplicate exercise id in bank; keeping the first");
                continue;
            }
            catalog.insert(ex);
        }
        for ex in seeds {
            if !catalog.by_id.contains_key(&ex.id) {
                catalog.insert(ex);
            }
        }
        if catalog.is_empty() {
            warn!(target: "uml_trainer", "Exercise catalogue is empty");
        }

        for chapter in Chapter::ALL {
            info!(target: "uml_trainer", %chapter, exercises = catalog.count_in(chapter), "Startup exercise inventory");
        }
        catalog
    }

    /// Exercises worth zero points could never be completed; they are skipped.
    fn insert(&mut self, ex: ExerciseDefinition) {
        if ex.max_points == 0 {
            warn!(target: "uml_trainer", id = %ex.id, "Exercise has max_points = 0; skipping");
            return;
        }
        self.by_chapter.entry(ex.chapter).or_default().push(ex.id.clone());
        self.by_id.insert(ex.id.clone(), Arc::new(ex));
    }

    pub fn get(&self, id: &str) -> Option<Arc<ExerciseDefinition>> {
        self.by_id.get(id).cloned()
    }

    /// Exercises of one chapter, in insertion order.
    pub fn in_chapter(&self, chapter: Chapter) -> Vec<Arc<ExerciseDefinition>> {
        self.by_chapter
            .get(&chapter)
            .map(|ids| ids.iter().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn count_in(&self, chapter: Chapter) -> usize {
        self.by_chapter.get(&chapter).map(Vec::len).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Current content version of every exercise, by id.
    pub fn versions(&self) -> BTreeMap<String, u32> {
        self.by_id.iter().map(|(id, ex)| (id.clone(), ex.version)).collect()
    }

    /// Mastery targets: catalogue counts, overridden per chapter.
    pub fn targets(&self, overrides: &BTreeMap<Chapter, usize>) -> ChapterTargets {
        let mut targets = ChapterTargets::default();
        for chapter in Chapter::ALL {
            let n = overrides.get(&chapter).copied().unwrap_or_else(|| self.count_in(chapter));
            targets.set(chapter, n);
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeds::seed_exercises;
    use crate::validate::{AnswerKey, SequenceKey};

    fn custom(id: &str, chapter: Chapter) -> ExerciseDefinition {
        ExerciseDefinition {
            id: id.into(),
            version: 4,
            chapter,
            title: "custom".into(),
            prompt: String::new(),
            max_points: 2,
            hints: vec![],
            key: AnswerKey::Sequence(SequenceKey { correct_order: vec!["a".into(), "b".into()] }),
        }
    }

    #[test]
    fn bank_wins_over_seeds() {
        let catalog = Catalog::build(vec![custom("uc-include", Chapter::UseCase)], seed_exercises());
        assert_eq!(catalog.get("uc-include").unwrap().version, 4);
        assert_eq!(catalog.len(), seed_exercises().len());
    }

    #[test]
    fn targets_default_to_chapter_counts() {
        let catalog = Catalog::build(vec![custom("extra", Chapter::Class)], seed_exercises());
        let mut overrides = BTreeMap::new();
        overrides.insert(Chapter::State, 1);
        let targets = catalog.targets(&overrides);
        assert_eq!(targets.get(Chapter::Class), 3);
        assert_eq!(targets.get(Chapter::State), 1);
        assert_eq!(targets.get(Chapter::Sequence), 2);
    }

    #[test]
    fn zero_point_exercises_are_skipped() {
        let mut free = custom("free", Chapter::Activity);
        free.max_points = 0;
        let catalog = Catalog::build(vec![free], vec![]);
        assert!(catalog.get("free").is_none());
        assert!(catalog.is_empty());
        assert_eq!(catalog.targets(&BTreeMap::new()).get(Chapter::Activity), 0);
    }

    #[test]
    fn versions_follow_the_winning_definition() {
        let catalog = Catalog::build(vec![custom("uc-include", Chapter::UseCase)], seed_exercises());
        let versions = catalog.versions();
        assert_eq!(versions.get("uc-include"), Some(&4));
        assert_eq!(versions.get("uc-actors"), Some(&1));
        assert_eq!(versions.len(), catalog.len());
    }

    #[test]
    fn chapter_listing_keeps_order() {
        let catalog = Catalog::build(vec![], seed_exercises());
        let ids: Vec<String> = catalog.in_chapter(Chapter::Class).iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec!["cls-extract-nouns", "cls-relationships"]);
    }
}
