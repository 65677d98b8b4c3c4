//! Application state: exercise catalogue, mastery targets, persistence backend,
//! and the per-learner stores plus their open exercise sessions.
//!
//! Each resident learner sits behind its own mutex; the outer map lock is
//! only held to look up, insert or evict entries. Store work (which may hit
//! the disk) runs on the blocking pool while the learner's mutex is held, so
//! the single-writer assumption of the stores holds per learner.
//!
//! Read-only paths never make a learner resident. The resident set is
//! bounded; when full, the least recently used idle learner is dropped.
//! Its progress and badges are already persisted, only open sessions and
//! pending notifications go with it.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument};

use crate::achievements::ChapterTargets;
use crate::catalog::Catalog;
use crate::config::{
    load_trainer_config_from_env, resolve_data_dir, resolve_max_resident, DEFAULT_MAX_RESIDENT_LEARNERS,
};
use crate::domain::ExerciseDefinition;
use crate::error::ApiError;
use crate::persistence::{FileStore, KeyValueStore, MemoryStore};
use crate::seeds::seed_exercises;
use crate::session::ExerciseSession;
use crate::tracker::Tracker;

/// Stores and open sessions of one learner.
pub struct Learner {
    pub tracker: Tracker,
    pub sessions: HashMap<String, ExerciseSession>,
}

impl Learner {
    /// Load both snapshots and drop progress recorded against older content.
    pub fn load(
        backend: Arc<dyn KeyValueStore>,
        learner_id: &str,
        targets: ChapterTargets,
        versions: &BTreeMap<String, u32>,
    ) -> Self {
        let mut tracker = Tracker::load(backend, learner_id, targets);
        tracker.drop_stale(versions);
        Self { tracker, sessions: HashMap::new() }
    }

    /// Open (or reuse) the session for `exercise`.
    pub fn session(&mut self, exercise: &Arc<ExerciseDefinition>) -> &mut ExerciseSession {
        self.sessions
            .entry(exercise.id.clone())
            .or_insert_with(|| ExerciseSession::new(exercise.clone()))
    }
}

/// `None` until the first operation loads the snapshots.
type LearnerSlot = Arc<Mutex<Option<Learner>>>;

struct Resident {
    slot: LearnerSlot,
    last_used: AtomicU64,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub targets: ChapterTargets,
    pub backend: Arc<dyn KeyValueStore>,
    versions: Arc<BTreeMap<String, u32>>,
    max_resident: usize,
    clock: Arc<AtomicU64>,
    learners: Arc<RwLock<HashMap<String, Resident>>>,
}

impl AppState {
    /// Build state from env: load config, merge bank with seeds, pick the backend.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Self {
        let cfg = load_trainer_config_from_env();

        let bank = cfg.as_ref().map(|c| c.exercises.clone()).unwrap_or_default();
        let catalog = Catalog::build(bank, seed_exercises());
        let overrides = cfg.as_ref().map(|c| c.chapter_targets()).unwrap_or_default();
        let targets = catalog.targets(&overrides);

        let backend: Arc<dyn KeyValueStore> = match resolve_data_dir(cfg.as_ref()) {
            Some(dir) => {
                info!(target: "uml_trainer", data_dir = %dir.display(), "File persistence enabled.");
                Arc::new(FileStore::new(dir))
            }
            None => {
                info!(target: "uml_trainer", "No data directory configured; progress lives in memory only.");
                Arc::new(MemoryStore::new())
            }
        };

        let max_resident = resolve_max_resident(cfg.as_ref());
        info!(target: "uml_trainer", max_resident, "Resident learner limit");
        Self::with_parts(catalog, targets, backend).with_max_resident(max_resident)
    }

    pub fn with_parts(catalog: Catalog, targets: ChapterTargets, backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            versions: Arc::new(catalog.versions()),
            catalog: Arc::new(catalog),
            targets,
            backend,
            max_resident: DEFAULT_MAX_RESIDENT_LEARNERS,
            clock: Arc::new(AtomicU64::new(0)),
            learners: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_max_resident(mut self, max_resident: usize) -> Self {
        self.max_resident = max_resident.max(1);
        self
    }

    /// Run `f` against the learner, making them resident (and loading their
    /// snapshots) on first use.
    #[instrument(level = "debug", skip(self, f))]
    pub async fn with_learner<R, F>(&self, learner_id: &str, f: F) -> Result<R, ApiError>
    where
        F: FnOnce(&mut Learner) -> R + Send + 'static,
        R: Send + 'static,
    {
        let slot = self.resident(learner_id).await;
        let guard = slot.lock_owned().await;
        let load = self.loader(learner_id);
        run_blocking(move || {
            let mut guard = guard;
            let learner = guard.get_or_insert_with(load);
            f(learner)
        })
        .await
    }

    /// Like `with_learner`, but a learner that is not resident is loaded into
    /// a throwaway value and not kept.
    #[instrument(level = "debug", skip(self, f))]
    pub async fn read_learner<R, F>(&self, learner_id: &str, f: F) -> Result<R, ApiError>
    where
        F: FnOnce(&mut Learner) -> R + Send + 'static,
        R: Send + 'static,
    {
        let load = self.loader(learner_id);
        match self.lookup(learner_id).await {
            Some(slot) => {
                let guard = slot.lock_owned().await;
                run_blocking(move || {
                    let mut guard = guard;
                    f(guard.get_or_insert_with(load))
                })
                .await
            }
            None => run_blocking(move || f(&mut load())).await,
        }
    }

    pub async fn resident_learners(&self) -> usize {
        self.learners.read().await.len()
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn loader(&self, learner_id: &str) -> impl FnOnce() -> Learner + Send + 'static {
        let backend = self.backend.clone();
        let targets = self.targets.clone();
        let versions = self.versions.clone();
        let learner_id = learner_id.to_string();
        move || {
            info!(target: "uml_trainer", %learner_id, "Loading learner");
            Learner::load(backend, &learner_id, targets, &versions)
        }
    }

    async fn lookup(&self, learner_id: &str) -> Option<LearnerSlot> {
        let learners = self.learners.read().await;
        learners.get(learner_id).map(|r| {
            r.last_used.store(self.tick(), Ordering::Relaxed);
            r.slot.clone()
        })
    }

    async fn resident(&self, learner_id: &str) -> LearnerSlot {
        if let Some(slot) = self.lookup(learner_id).await {
            return slot;
        }
        let mut learners = self.learners.write().await;
        if let Some(r) = learners.get(learner_id) {
            r.last_used.store(self.tick(), Ordering::Relaxed);
            return r.slot.clone();
        }
        if learners.len() >= self.max_resident {
            evict_idle(&mut learners);
        }
        let slot: LearnerSlot = Arc::new(Mutex::new(None));
        learners.insert(
            learner_id.to_string(),
            Resident { slot: slot.clone(), last_used: AtomicU64::new(self.tick()) },
        );
        slot
    }
}

/// Drop the least recently used learner nobody is holding. With every
/// learner busy the map briefly grows past its limit instead.
fn evict_idle(learners: &mut HashMap<String, Resident>) {
    let victim = learners
        .iter()
        .filter(|(_, r)| Arc::strong_count(&r.slot) == 1)
        .min_by_key(|(_, r)| r.last_used.load(Ordering::Relaxed))
        .map(|(id, _)| id.clone());
    match victim {
        Some(id) => {
            learners.remove(&id);
            debug!(target: "uml_trainer", learner_id = %id, "Evicted idle learner");
        }
        None => debug!(target: "uml_trainer", resident = learners.len(), "No idle learner to evict"),
    }
}

/// Store operations may block on file I/O; keep them off the async workers.
async fn run_blocking<R, F>(f: F) -> Result<R, ApiError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!(target: "uml_trainer", error = %e, "Learner task failed");
        ApiError::Internal(e.to_string())
    })
}

/// Learner ids double as storage path segments: 1-64 ASCII alphanumerics, `-` or `_`.
pub fn is_valid_learner_id(id: &str) -> bool {
    (1..=64).contains(&id.len()) && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Chapter;
    use crate::validate::{AnswerKey, MultipleChoiceKey};

    fn state() -> AppState {
        let catalog = Catalog::build(vec![], seed_exercises());
        let targets = catalog.targets(&Default::default());
        AppState::with_parts(catalog, targets, Arc::new(MemoryStore::new()))
    }

    #[test]
    fn learner_id_rules() {
        assert!(is_valid_learner_id("alice_01"));
        assert!(is_valid_learner_id("2b6f0c1e-7f1a-4a57-9d43-0c4b1f6d2a10"));
        assert!(!is_valid_learner_id(""));
        assert!(!is_valid_learner_id("../etc"));
        assert!(!is_valid_learner_id("a/b"));
        assert!(!is_valid_learner_id(&"x".repeat(65)));
    }

    #[tokio::test]
    async fn learners_load_lazily_and_persist_through_backend() {
        let st = state();
        assert_eq!(st.resident_learners().await, 0);
        st.with_learner("amy", |l| l.tracker.mark_theory_read(Chapter::Class)).await.unwrap();
        assert_eq!(st.resident_learners().await, 1);

        // A fresh state over the same backend sees the snapshot.
        let again = AppState::with_parts(Catalog::build(vec![], seed_exercises()), st.targets.clone(), st.backend.clone());
        let read = again
            .read_learner("amy", |l| l.tracker.progress().state().is_theory_read(Chapter::Class))
            .await
            .unwrap();
        assert!(read);
    }

    #[tokio::test]
    async fn reads_do_not_make_learners_resident() {
        let st = state();
        for i in 0..200 {
            let id = format!("visitor-{i}");
            let pct = st.read_learner(&id, |l| l.tracker.progress().state().overall_percentage()).await.unwrap();
            assert_eq!(pct, 0.0);
        }
        assert_eq!(st.resident_learners().await, 0);
    }

    #[tokio::test]
    async fn reads_see_resident_state() {
        let st = state();
        let ex = st.catalog.get("uc-include").unwrap();
        st.with_learner("ben", move |l| {
            l.session(&ex).toggle_hints();
        })
        .await
        .unwrap();
        let visible = st
            .read_learner("ben", |l| l.sessions.get("uc-include").map(|s| s.hints_visible()))
            .await
            .unwrap();
        assert_eq!(visible, Some(true));
    }

    #[tokio::test]
    async fn resident_set_is_bounded_by_lru_eviction() {
        let st = state().with_max_resident(3);
        for id in ["a", "b", "c"] {
            st.with_learner(id, |l| l.tracker.mark_theory_read(Chapter::State)).await.unwrap();
        }
        // Touch "a" so "b" becomes the oldest.
        st.with_learner("a", |_| ()).await.unwrap();
        st.with_learner("d", |_| ()).await.unwrap();
        assert_eq!(st.resident_learners().await, 3);

        let learners = st.learners.read().await;
        assert!(learners.contains_key("a"));
        assert!(!learners.contains_key("b"));
        drop(learners);

        // Evicted learners come back from the backend.
        let read = st
            .with_learner("b", |l| l.tracker.progress().state().is_theory_read(Chapter::State))
            .await
            .unwrap();
        assert!(read);
    }

    #[tokio::test]
    async fn busy_learners_are_not_evicted() {
        let st = state().with_max_resident(1);
        st.with_learner("held", |_| ()).await.unwrap();
        let slot = st.lookup("held").await.unwrap();
        let _guard = slot.lock().await;
        st.with_learner("other", |_| ()).await.unwrap();
        assert_eq!(st.resident_learners().await, 2);
    }

    #[tokio::test]
    async fn learners_on_different_ids_do_not_share_a_lock() {
        let st = state();
        st.with_learner("slow", |_| ()).await.unwrap();
        let slot = st.lookup("slow").await.unwrap();
        let _guard = slot.lock().await;
        // "slow" is locked; "fast" must still be served.
        let pct = st
            .with_learner("fast", |l| l.tracker.progress().state().overall_percentage())
            .await
            .unwrap();
        assert_eq!(pct, 0.0);
    }

    #[tokio::test]
    async fn stale_progress_is_dropped_on_load() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let v1 = Catalog::build(vec![], seed_exercises());
        let st = AppState::with_parts(v1, ChapterTargets::default(), backend.clone());
        st.with_learner("eve", |l| l.tracker.record_result(Chapter::UseCase, "uc-include", 1, 5, 5))
            .await
            .unwrap();

        let mut bumped = seed_exercises().into_iter().find(|e| e.id == "uc-include").unwrap();
        bumped.version = 2;
        bumped.key = AnswerKey::MultipleChoice(MultipleChoiceKey { correct_ids: vec!["extend".into()] });
        let v2 = Catalog::build(vec![bumped], seed_exercises());
        let again = AppState::with_parts(v2, ChapterTargets::default(), backend);
        let recorded = again
            .read_learner("eve", |l| l.tracker.progress().state().exercise(Chapter::UseCase, "uc-include").is_some())
            .await
            .unwrap();
        assert!(!recorded);
    }
}
