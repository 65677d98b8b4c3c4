//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Resolving exercises and chapters from request input
//!   - Driving exercise sessions (answer, submit, reset, hints)
//!   - Building progress / achievement views for a learner
//!   - Theory flags and progress resets

use std::sync::Arc;

use tracing::{info, instrument};

use crate::achievements::AchievementView;
use crate::catalog::Catalog;
use crate::domain::{Chapter, ExerciseDefinition};
use crate::error::ApiError;
use crate::protocol::{
    to_out, ChapterOut, ChapterProgressOut, ExerciseProgressOut, HintsOut, ProgressOut, SubmitOut,
};
use crate::session::{ExerciseSession, SessionView};
use crate::state::{is_valid_learner_id, AppState, Learner};
use crate::validate::Answer;

pub fn check_learner(learner_id: &str) -> Result<(), ApiError> {
    if is_valid_learner_id(learner_id) {
        Ok(())
    } else {
        Err(ApiError::InvalidLearner(learner_id.to_string()))
    }
}

pub fn find_exercise(state: &AppState, exercise_id: &str) -> Result<Arc<ExerciseDefinition>, ApiError> {
    state
        .catalog
        .get(exercise_id)
        .ok_or_else(|| ApiError::UnknownExercise(exercise_id.to_string()))
}

pub fn parse_chapter(raw: &str) -> Result<Chapter, ApiError> {
    raw.parse::<Chapter>().map_err(|_| ApiError::UnknownChapter(raw.to_string()))
}

pub fn list_chapters(state: &AppState) -> Vec<ChapterOut> {
    Chapter::ALL
        .into_iter()
        .map(|chapter| ChapterOut {
            chapter,
            title: chapter.title(),
            target: state.targets.get(chapter),
            exercises: state.catalog.in_chapter(chapter).iter().map(|e| to_out(e)).collect(),
        })
        .collect()
}

#[instrument(level = "debug", skip(state))]
pub async fn session_view(state: &AppState, learner_id: &str, exercise_id: &str) -> Result<SessionView, ApiError> {
    check_learner(learner_id)?;
    let ex = find_exercise(state, exercise_id)?;
    state
        .read_learner(learner_id, move |l| match l.sessions.get(&ex.id) {
            Some(session) => session.view(),
            None => ExerciseSession::new(ex).view(),
        })
        .await
}

#[instrument(level = "info", skip(state, answer), fields(kind = answer.kind()))]
pub async fn set_answer(state: &AppState, learner_id: &str, exercise_id: &str, answer: Answer) -> Result<SessionView, ApiError> {
    check_learner(learner_id)?;
    let ex = find_exercise(state, exercise_id)?;
    state
        .with_learner(learner_id, move |l| -> Result<SessionView, ApiError> {
            let session = l.session(&ex);
            session.set_answer(answer)?;
            Ok(session.view())
        })
        .await?
}

/// Gate on answer completeness, then grade, record and evaluate badges.
#[instrument(level = "info", skip(state))]
pub async fn submit(state: &AppState, learner_id: &str, exercise_id: &str) -> Result<SubmitOut, ApiError> {
    check_learner(learner_id)?;
    let ex = find_exercise(state, exercise_id)?;
    let learner = learner_id.to_string();
    state
        .with_learner(learner_id, move |l| -> Result<SubmitOut, ApiError> {
            let Learner { tracker, sessions } = l;
            let session = sessions
                .entry(ex.id.clone())
                .or_insert_with(|| ExerciseSession::new(ex.clone()));
            if session.answer().is_some_and(|a| !a.is_complete(&ex.key)) {
                return Err(ApiError::IncompleteAnswer);
            }
            let submission = session.submit_with_key(tracker)?;
            info!(target: "session", %learner, exercise = %ex.id, correct = submission.result.correct, unlocked = submission.unlocked.len(), "Submission recorded");
            Ok(SubmitOut { result: submission.result, unlocked: submission.unlocked, session: session.view() })
        })
        .await?
}

#[instrument(level = "info", skip(state))]
pub async fn reset_session(state: &AppState, learner_id: &str, exercise_id: &str) -> Result<SessionView, ApiError> {
    check_learner(learner_id)?;
    let ex = find_exercise(state, exercise_id)?;
    state
        .with_learner(learner_id, move |l| {
            let session = l.session(&ex);
            session.reset();
            session.view()
        })
        .await
}

#[instrument(level = "debug", skip(state))]
pub async fn toggle_hints(state: &AppState, learner_id: &str, exercise_id: &str) -> Result<HintsOut, ApiError> {
    check_learner(learner_id)?;
    let ex = find_exercise(state, exercise_id)?;
    state
        .with_learner(learner_id, move |l| {
            let session = l.session(&ex);
            let visible = session.toggle_hints();
            HintsOut { visible, hints: session.visible_hints().to_vec() }
        })
        .await
}

#[instrument(level = "debug", skip(state))]
pub async fn progress(state: &AppState, learner_id: &str) -> Result<ProgressOut, ApiError> {
    check_learner(learner_id)?;
    let catalog = state.catalog.clone();
    state.read_learner(learner_id, move |l| progress_out(l, &catalog)).await
}

/// Recorded results are listed per catalogue exercise, at its current version.
fn progress_out(l: &Learner, catalog: &Catalog) -> ProgressOut {
    let p = l.tracker.progress().state();
    let targets = l.tracker.targets();
    let chapters = Chapter::ALL
        .into_iter()
        .map(|chapter| {
            let s = p.chapter_summary(chapter);
            ChapterProgressOut {
                chapter,
                theory_read: s.theory_read,
                completed: s.completed,
                recorded: s.recorded,
                target: targets.get(chapter),
                mastered: targets.is_mastered(chapter, p),
            }
        })
        .collect();
    let exercises = Chapter::ALL
        .into_iter()
        .flat_map(|chapter| catalog.in_chapter(chapter))
        .filter_map(|ex| {
            p.current_exercise(ex.chapter, &ex.id, ex.version).map(|e| ExerciseProgressOut {
                exercise_id: ex.id.clone(),
                chapter: ex.chapter,
                version: e.version,
                completed: e.completed,
                score: e.score,
                max_score: e.max_score,
                attempts: e.attempts,
                last_attempt: e.last_attempt,
            })
        })
        .collect();
    ProgressOut { overall_percentage: p.overall_percentage(), chapters, exercises }
}

#[instrument(level = "info", skip(state))]
pub async fn mark_theory_read(state: &AppState, learner_id: &str, chapter: Chapter) -> Result<ProgressOut, ApiError> {
    check_learner(learner_id)?;
    let catalog = state.catalog.clone();
    state
        .with_learner(learner_id, move |l| {
            l.tracker.mark_theory_read(chapter);
            progress_out(l, &catalog)
        })
        .await
}

pub async fn achievements(state: &AppState, learner_id: &str) -> Result<Vec<AchievementView>, ApiError> {
    check_learner(learner_id)?;
    state.read_learner(learner_id, |l| l.tracker.achievements().views()).await
}

/// Drain pending unlock announcements. Only resident learners have any.
pub async fn notifications(state: &AppState, learner_id: &str) -> Result<Vec<AchievementView>, ApiError> {
    check_learner(learner_id)?;
    state
        .read_learner(learner_id, |l| {
            let ids = l.tracker.achievements_mut().drain_notifications();
            let store = l.tracker.achievements();
            ids.iter().filter_map(|id| store.view(id)).collect()
        })
        .await
}

#[instrument(level = "info", skip(state))]
pub async fn reset_exercise_progress(state: &AppState, learner_id: &str, exercise_id: &str) -> Result<ProgressOut, ApiError> {
    check_learner(learner_id)?;
    let ex = find_exercise(state, exercise_id)?;
    let catalog = state.catalog.clone();
    state
        .with_learner(learner_id, move |l| {
            l.tracker.reset_exercise(ex.chapter, &ex.id);
            if let Some(session) = l.sessions.get_mut(&ex.id) {
                session.reset();
            }
            progress_out(l, &catalog)
        })
        .await
}

#[instrument(level = "info", skip(state))]
pub async fn reset_all_progress(state: &AppState, learner_id: &str) -> Result<ProgressOut, ApiError> {
    check_learner(learner_id)?;
    let catalog = state.catalog.clone();
    state
        .with_learner(learner_id, move |l| {
            l.tracker.reset_all();
            l.sessions.clear();
            progress_out(l, &catalog)
        })
        .await
}
