//! Router-level tests: requests go through the full axum stack via `oneshot`.

use std::sync::Arc;

use axum::{
  body::{to_bytes, Body},
  http::{Method, Request, StatusCode},
  Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use uml_trainer::{
  build_router,
  catalog::Catalog,
  persistence::{FileStore, KeyValueStore, MemoryStore},
  seeds::seed_exercises,
  AppState,
};

fn app_with(backend: Arc<dyn KeyValueStore>) -> Router {
  let catalog = Catalog::build(vec![], seed_exercises());
  let targets = catalog.targets(&Default::default());
  build_router(Arc::new(AppState::with_parts(catalog, targets, backend)))
}

fn app() -> Router {
  app_with(Arc::new(MemoryStore::new()))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let builder = Request::builder().method(method).uri(uri);
  let req = match body {
    Some(v) => builder
      .header("content-type", "application/json")
      .body(Body::from(v.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  let res = app.clone().oneshot(req).await.unwrap();
  let status = res.status();
  let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, value)
}

const BASE: &str = "/api/v1/learners/ada/exercises/uc-include";

#[tokio::test]
async fn health_and_catalogue() {
  let app = app();
  let (status, body) = call(&app, Method::GET, "/api/v1/health", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["ok"], true);

  let (status, body) = call(&app, Method::GET, "/api/v1/chapters", None).await;
  assert_eq!(status, StatusCode::OK);
  let chapters = body.as_array().unwrap();
  assert_eq!(chapters.len(), 5);
  assert_eq!(chapters[0]["chapter"], "class");
  assert_eq!(chapters[0]["target"], 2);

  let (status, body) = call(&app, Method::GET, "/api/v1/exercises/uc-include", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["kind"], "multiple_choice");
  assert_eq!(body["max_points"], 5);
  assert!(body.get("key").is_none(), "answer key must not leak");

  let (status, _) = call(&app, Method::GET, "/api/v1/exercises/nope", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn learner_ids_are_minted_and_checked() {
  let app = app();
  let (status, body) = call(&app, Method::POST, "/api/v1/learners", None).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["learner_id"].as_str().unwrap().len(), 36);

  let (status, body) = call(&app, Method::GET, "/api/v1/learners/a.b/progress", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("a.b"));
}

#[tokio::test]
async fn answer_submit_and_unlock_flow() {
  let app = app();

  let (status, body) = call(&app, Method::GET, &format!("{BASE}/session"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["phase"], "idle");
  assert_eq!(body["ready_to_submit"], false);

  let answer = json!({ "answer": { "kind": "multiple_choice", "selected": ["include"] } });
  let (status, body) = call(&app, Method::PUT, &format!("{BASE}/answer"), Some(answer)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["phase"], "in_progress");
  assert_eq!(body["ready_to_submit"], true);

  let (status, body) = call(&app, Method::POST, &format!("{BASE}/submit"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["result"]["correct"], true);
  assert_eq!(body["result"]["score"], 5);
  assert_eq!(body["session"]["phase"], "completed");
  let unlocked: Vec<&str> = body["unlocked"].as_array().unwrap().iter().filter_map(|v| v.as_str()).collect();
  assert_eq!(unlocked, vec!["first_steps", "perfectionist"]);

  let (_, progress) = call(&app, Method::GET, "/api/v1/learners/ada/progress", None).await;
  let exercises = progress["exercises"].as_array().unwrap();
  assert_eq!(exercises.len(), 1);
  assert_eq!(exercises[0]["exercise_id"], "uc-include");
  assert_eq!(exercises[0]["attempts"], 1);
  assert!(progress["overall_percentage"].as_f64().unwrap() > 0.0);

  // Notifications drain once.
  let (_, notes) = call(&app, Method::GET, "/api/v1/learners/ada/notifications", None).await;
  assert_eq!(notes["unlocked"].as_array().unwrap().len(), 2);
  let (_, notes) = call(&app, Method::GET, "/api/v1/learners/ada/notifications", None).await;
  assert!(notes["unlocked"].as_array().unwrap().is_empty());

  let (_, badges) = call(&app, Method::GET, "/api/v1/learners/ada/achievements", None).await;
  let first = badges.as_array().unwrap().iter().find(|b| b["id"] == "first_steps").unwrap();
  assert!(first["unlocked_at"].is_string());
}

#[tokio::test]
async fn submission_gate_errors() {
  let app = app();

  let (status, _) = call(&app, Method::POST, &format!("{BASE}/submit"), None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let empty = json!({ "answer": { "kind": "multiple_choice", "selected": [] } });
  call(&app, Method::PUT, &format!("{BASE}/answer"), Some(empty)).await;
  let (status, _) = call(&app, Method::POST, &format!("{BASE}/submit"), None).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

  let wrong_shape = json!({ "answer": { "kind": "sequence", "order": ["a"] } });
  call(&app, Method::PUT, &format!("{BASE}/answer"), Some(wrong_shape)).await;
  let (status, _) = call(&app, Method::POST, &format!("{BASE}/submit"), None).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

  // Nothing was recorded.
  let (_, progress) = call(&app, Method::GET, "/api/v1/learners/ada/progress", None).await;
  assert!(progress["exercises"].as_array().unwrap().is_empty());

  let (status, body) = call(&app, Method::POST, &format!("{BASE}/reset"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["phase"], "idle");
  assert!(body["answer"].is_null());
}

#[tokio::test]
async fn hints_theory_and_resets() {
  let app = app();

  let (_, hints) = call(&app, Method::POST, &format!("{BASE}/hints"), None).await;
  assert_eq!(hints["visible"], true);
  assert_eq!(hints["hints"].as_array().unwrap().len(), 1);
  let (_, hints) = call(&app, Method::POST, &format!("{BASE}/hints"), None).await;
  assert_eq!(hints["visible"], false);
  assert!(hints["hints"].as_array().unwrap().is_empty());

  let (status, progress) = call(&app, Method::POST, "/api/v1/learners/ada/chapters/use_case/theory", None).await;
  assert_eq!(status, StatusCode::OK);
  let use_case = progress["chapters"].as_array().unwrap().iter().find(|c| c["chapter"] == "use_case").unwrap();
  assert_eq!(use_case["theory_read"], true);

  let (status, _) = call(&app, Method::POST, "/api/v1/learners/ada/chapters/erd/theory", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let answer = json!({ "answer": { "kind": "multiple_choice", "selected": ["include"] } });
  call(&app, Method::PUT, &format!("{BASE}/answer"), Some(answer)).await;
  call(&app, Method::POST, &format!("{BASE}/submit"), None).await;

  let (status, progress) = call(&app, Method::DELETE, &format!("{BASE}/progress"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(progress["exercises"].as_array().unwrap().is_empty());

  let (status, progress) = call(&app, Method::DELETE, "/api/v1/learners/ada/progress", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(progress["overall_percentage"], 0.0);

  // Badges survive a full reset.
  let (_, badges) = call(&app, Method::GET, "/api/v1/learners/ada/achievements", None).await;
  let first = badges.as_array().unwrap().iter().find(|b| b["id"] == "first_steps").unwrap();
  assert!(first["unlocked_at"].is_string());
}

#[tokio::test]
async fn progress_survives_restart_with_file_store() {
  let dir = tempfile::tempdir().unwrap();
  let answer = json!({ "answer": { "kind": "multiple_choice", "selected": ["include"] } });

  let first = app_with(Arc::new(FileStore::new(dir.path())));
  call(&first, Method::PUT, &format!("{BASE}/answer"), Some(answer)).await;
  let (status, _) = call(&first, Method::POST, &format!("{BASE}/submit"), None).await;
  assert_eq!(status, StatusCode::OK);

  let second = app_with(Arc::new(FileStore::new(dir.path())));
  let (_, progress) = call(&second, Method::GET, "/api/v1/learners/ada/progress", None).await;
  assert_eq!(progress["exercises"].as_array().unwrap().len(), 1);
  let (_, badges) = call(&second, Method::GET, "/api/v1/learners/ada/achievements", None).await;
  let perfect = badges.as_array().unwrap().iter().find(|b| b["id"] == "perfectionist").unwrap();
  assert!(perfect["unlocked_at"].is_string());
}

#[tokio::test]
async fn read_only_requests_leave_no_resident_learner() {
  let catalog = Catalog::build(vec![], seed_exercises());
  let targets = catalog.targets(&Default::default());
  let state = Arc::new(AppState::with_parts(catalog, targets, Arc::new(MemoryStore::new())));
  let app = build_router(state.clone());

  for i in 0..50 {
    let (status, _) = call(&app, Method::GET, &format!("/api/v1/learners/guest{i}/progress"), None).await;
    assert_eq!(status, StatusCode::OK);
    call(&app, Method::GET, &format!("/api/v1/learners/guest{i}/achievements"), None).await;
    call(&app, Method::GET, &format!("/api/v1/learners/guest{i}/exercises/uc-include/session"), None).await;
  }
  assert_eq!(state.resident_learners().await, 0);

  call(&app, Method::POST, "/api/v1/learners/guest0/exercises/uc-include/hints", None).await;
  assert_eq!(state.resident_learners().await, 1);
}

#[tokio::test]
async fn content_bump_hides_old_results() {
  let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
  let first = app_with(backend.clone());
  let answer = json!({ "answer": { "kind": "multiple_choice", "selected": ["include"] } });
  call(&first, Method::PUT, &format!("{BASE}/answer"), Some(answer)).await;
  call(&first, Method::POST, &format!("{BASE}/submit"), None).await;

  let mut bumped = seed_exercises().into_iter().find(|e| e.id == "uc-include").unwrap();
  bumped.version = 2;
  let catalog = Catalog::build(vec![bumped], seed_exercises());
  let targets = catalog.targets(&Default::default());
  let second = build_router(Arc::new(AppState::with_parts(catalog, targets, backend)));

  let (_, progress) = call(&second, Method::GET, "/api/v1/learners/ada/progress", None).await;
  assert!(progress["exercises"].as_array().unwrap().is_empty());
  let use_case = progress["chapters"].as_array().unwrap().iter().find(|c| c["chapter"] == "use_case").unwrap();
  assert_eq!(use_case["completed"], 0);
  // Badges are never revoked.
  let (_, badges) = call(&second, Method::GET, "/api/v1/learners/ada/achievements", None).await;
  let first_steps = badges.as_array().unwrap().iter().find(|b| b["id"] == "first_steps").unwrap();
  assert!(first_steps["unlocked_at"].is_string());
}

#[tokio::test]
async fn zero_point_bank_exercise_is_not_served() {
  let mut free = seed_exercises().into_iter().find(|e| e.id == "uc-include").unwrap();
  free.id = "uc-free".into();
  free.max_points = 0;
  let catalog = Catalog::build(vec![free], seed_exercises());
  let targets = catalog.targets(&Default::default());
  let app = build_router(Arc::new(AppState::with_parts(catalog, targets, Arc::new(MemoryStore::new()))));

  let (status, _) = call(&app, Method::GET, "/api/v1/exercises/uc-free", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let answer = json!({ "answer": { "kind": "multiple_choice", "selected": ["extend"] } });
  let (status, _) = call(&app, Method::PUT, "/api/v1/learners/ada/exercises/uc-free/answer", Some(answer)).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}
