//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Path, State}, http::StatusCode, Json, response::IntoResponse};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::protocol::*;
use crate::session::SessionView;
use crate::state::AppState;
use crate::logic;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_chapters(State(state): State<Arc<AppState>>) -> Json<Vec<ChapterOut>> {
  Json(logic::list_chapters(&state))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_exercise(
  State(state): State<Arc<AppState>>,
  Path(exercise_id): Path<String>,
) -> Result<Json<ExerciseOut>, ApiError> {
  let ex = logic::find_exercise(&state, &exercise_id)?;
  Ok(Json(to_out(&ex)))
}

/// Mint a fresh learner id. Nothing is stored until the learner does something.
#[instrument(level = "info")]
pub async fn http_post_learner() -> impl IntoResponse {
  let learner_id = Uuid::new_v4().to_string();
  info!(target: "uml_trainer", %learner_id, "Learner id issued");
  (StatusCode::CREATED, Json(LearnerOut { learner_id }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(
  State(state): State<Arc<AppState>>,
  Path(learner): Path<String>,
) -> Result<Json<ProgressOut>, ApiError> {
  Ok(Json(logic::progress(&state, &learner).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_progress(
  State(state): State<Arc<AppState>>,
  Path(learner): Path<String>,
) -> Result<Json<ProgressOut>, ApiError> {
  Ok(Json(logic::reset_all_progress(&state, &learner).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_theory(
  State(state): State<Arc<AppState>>,
  Path((learner, chapter)): Path<(String, String)>,
) -> Result<Json<ProgressOut>, ApiError> {
  let chapter = logic::parse_chapter(&chapter)?;
  Ok(Json(logic::mark_theory_read(&state, &learner, chapter).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_achievements(
  State(state): State<Arc<AppState>>,
  Path(learner): Path<String>,
) -> Result<Json<Vec<crate::achievements::AchievementView>>, ApiError> {
  Ok(Json(logic::achievements(&state, &learner).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_notifications(
  State(state): State<Arc<AppState>>,
  Path(learner): Path<String>,
) -> Result<Json<NotificationsOut>, ApiError> {
  let unlocked = logic::notifications(&state, &learner).await?;
  Ok(Json(NotificationsOut { unlocked }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path((learner, exercise_id)): Path<(String, String)>,
) -> Result<Json<SessionView>, ApiError> {
  Ok(Json(logic::session_view(&state, &learner, &exercise_id).await?))
}

#[instrument(level = "info", skip(state, body), fields(kind = body.answer.kind()))]
pub async fn http_put_answer(
  State(state): State<Arc<AppState>>,
  Path((learner, exercise_id)): Path<(String, String)>,
  Json(body): Json<AnswerIn>,
) -> Result<Json<SessionView>, ApiError> {
  Ok(Json(logic::set_answer(&state, &learner, &exercise_id, body.answer).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_submit(
  State(state): State<Arc<AppState>>,
  Path((learner, exercise_id)): Path<(String, String)>,
) -> Result<Json<SubmitOut>, ApiError> {
  let out = logic::submit(&state, &learner, &exercise_id).await?;
  info!(target: "session", %learner, exercise = %exercise_id, score = out.result.score, max = out.result.max_score, "HTTP submit evaluated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_reset(
  State(state): State<Arc<AppState>>,
  Path((learner, exercise_id)): Path<(String, String)>,
) -> Result<Json<SessionView>, ApiError> {
  Ok(Json(logic::reset_session(&state, &learner, &exercise_id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_hints(
  State(state): State<Arc<AppState>>,
  Path((learner, exercise_id)): Path<(String, String)>,
) -> Result<Json<HintsOut>, ApiError> {
  Ok(Json(logic::toggle_hints(&state, &learner, &exercise_id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_exercise_progress(
  State(state): State<Arc<AppState>>,
  Path((learner, exercise_id)): Path<(String, String)>,
) -> Result<Json<ProgressOut>, ApiError> {
  Ok(Json(logic::reset_exercise_progress(&state, &learner, &exercise_id).await?))
}
