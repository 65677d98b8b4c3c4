//! Error types for grading, exercise sessions, persistence and the HTTP surface.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;

/// Raised when an answer cannot be graded against a key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("answer of kind '{found}' cannot be graded against a '{expected}' key")]
  ShapeMismatch { expected: &'static str, found: &'static str },
}

/// Lifecycle errors of a single exercise session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
  #[error("nothing to submit: no answer has been set")]
  NoAnswer,
  #[error("session failed earlier ({0}); reset it first")]
  Failed(String),
  #[error("evaluation failed: {0}")]
  EvaluationFailed(#[from] ValidationError),
}

/// Key-value persistence failures. Stores log and swallow these.
#[derive(Debug, Error)]
pub enum PersistenceError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("snapshot (de)serialization failed: {0}")]
  Serde(#[from] serde_json::Error),
  #[error("invalid storage key '{0}'")]
  InvalidKey(String),
  #[error("storage lock poisoned")]
  Poisoned,
}

/// Errors surfaced by HTTP / WebSocket handlers.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unknown exercise '{0}'")]
  UnknownExercise(String),
  #[error("unknown chapter '{0}'")]
  UnknownChapter(String),
  #[error("invalid learner id '{0}'")]
  InvalidLearner(String),
  #[error("answer is incomplete; every item must be answered before grading")]
  IncompleteAnswer,
  #[error(transparent)]
  Session(#[from] SessionError),
  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::UnknownExercise(_) | ApiError::UnknownChapter(_) => StatusCode::NOT_FOUND,
      ApiError::InvalidLearner(_) => StatusCode::BAD_REQUEST,
      ApiError::IncompleteAnswer => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Session(SessionError::EvaluationFailed(_)) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Session(_) => StatusCode::CONFLICT,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
