//! Per-exercise lifecycle: idle -> in progress -> submitted | completed.
//!
//! A session only holds transient UI state (working answer, last result,
//! hint visibility). Durable effects go through the learner's `Tracker`,
//! which is passed in explicitly on submit.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::domain::{ExerciseDefinition, ValidationResult};
use crate::error::{SessionError, ValidationError};
use crate::tracker::Tracker;
use crate::validate::{validate, Answer};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
  Idle,
  InProgress,
  Submitted,
  Completed,
  /// Grading blew up; only `reset` leaves this phase.
  Failed { reason: String },
}

/// What a submission produced: the grade and any badges it unlocked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Submission {
  pub result: ValidationResult,
  pub unlocked: Vec<String>,
}

pub struct ExerciseSession {
  exercise: Arc<ExerciseDefinition>,
  phase: Phase,
  answer: Option<Answer>,
  result: Option<ValidationResult>,
  attempts: u32,
  show_hints: bool,
}

impl ExerciseSession {
  pub fn new(exercise: Arc<ExerciseDefinition>) -> Self {
    Self { exercise, phase: Phase::Idle, answer: None, result: None, attempts: 0, show_hints: false }
  }

  pub fn exercise(&self) -> &ExerciseDefinition {
    &self.exercise
  }

  pub fn phase(&self) -> &Phase {
    &self.phase
  }

  pub fn answer(&self) -> Option<&Answer> {
    self.answer.as_ref()
  }

  pub fn result(&self) -> Option<&ValidationResult> {
    self.result.as_ref()
  }

  pub fn attempts(&self) -> u32 {
    self.attempts
  }

  /// Store the working answer; the first one moves the session out of idle.
  pub fn set_answer(&mut self, answer: Answer) -> Result<(), SessionError> {
    if let Phase::Failed { reason } = &self.phase {
      return Err(SessionError::Failed(reason.clone()));
    }
    self.answer = Some(answer);
    if self.phase == Phase::Idle {
      self.phase = Phase::InProgress;
    }
    Ok(())
  }

  /// Grade the current answer with `validator`, record it and evaluate badges.
  ///
  /// A validator error parks the session in `Failed` and leaves the stores
  /// untouched.
  #[instrument(level = "info", skip(self, validator, tracker), fields(exercise = %self.exercise.id))]
  pub fn submit<F>(&mut self, validator: F, tracker: &mut Tracker) -> Result<Submission, SessionError>
  where
    F: FnOnce(&Answer) -> Result<ValidationResult, ValidationError>,
  {
    if let Phase::Failed { reason } = &self.phase {
      return Err(SessionError::Failed(reason.clone()));
    }
    let answer = self.answer.as_ref().ok_or(SessionError::NoAnswer)?;

    let result = match validator(answer) {
      Ok(r) => r,
      Err(e) => {
        warn!(target: "session", exercise = %self.exercise.id, error = %e, "Grading failed; session parked");
        self.phase = Phase::Failed { reason: e.to_string() };
        self.result = None;
        return Err(SessionError::EvaluationFailed(e));
      }
    };

    self.attempts += 1;
    self.phase = if result.correct { Phase::Completed } else { Phase::Submitted };
    self.result = Some(result.clone());

    let ex = &self.exercise;
    let unlocked = tracker.record_result(ex.chapter, &ex.id, ex.version, result.score, result.max_score);
    info!(target: "session", exercise = %ex.id, correct = result.correct, score = result.score, max = result.max_score, attempts = self.attempts, "Submission graded");

    Ok(Submission { result, unlocked })
  }

  /// `submit` with the exercise's own answer key.
  pub fn submit_with_key(&mut self, tracker: &mut Tracker) -> Result<Submission, SessionError> {
    let exercise = self.exercise.clone();
    self.submit(|answer| validate(&exercise.key, answer, exercise.max_points), tracker)
  }

  /// Back to idle. Persisted progress is untouched.
  pub fn reset(&mut self) {
    self.phase = Phase::Idle;
    self.answer = None;
    self.result = None;
    self.show_hints = false;
  }

  pub fn toggle_hints(&mut self) -> bool {
    self.show_hints = !self.show_hints;
    self.show_hints
  }

  pub fn hints_visible(&self) -> bool {
    self.show_hints
  }

  pub fn visible_hints(&self) -> &[String] {
    if self.show_hints { self.exercise.hints.as_slice() } else { &[] }
  }

  /// Whether the current answer passes the submission gate.
  pub fn ready_to_submit(&self) -> bool {
    !matches!(self.phase, Phase::Failed { .. })
      && self.answer.as_ref().map(|a| a.is_complete(&self.exercise.key)).unwrap_or(false)
  }

  pub fn view(&self) -> SessionView {
    SessionView {
      exercise_id: self.exercise.id.clone(),
      phase: self.phase.clone(),
      answer: self.answer.clone(),
      result: self.result.clone(),
      attempts: self.attempts,
      hints: self.visible_hints().to_vec(),
      ready_to_submit: self.ready_to_submit(),
    }
  }
}

/// Serialisable snapshot of a session for clients.
#[derive(Clone, Debug, Serialize)]
pub struct SessionView {
  pub exercise_id: String,
  #[serde(flatten)]
  pub phase: Phase,
  pub answer: Option<Answer>,
  pub result: Option<ValidationResult>,
  pub attempts: u32,
  pub hints: Vec<String>,
  pub ready_to_submit: bool,
}
