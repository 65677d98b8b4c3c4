//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws?learner=<id>`
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers), adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    let exercise = "/api/v1/learners/:learner/exercises/:exercise";

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // Catalogue
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/chapters", get(http::http_get_chapters))
        .route("/api/v1/exercises/:exercise", get(http::http_get_exercise))
        // Learners
        .route("/api/v1/learners", post(http::http_post_learner))
        .route(
            "/api/v1/learners/:learner/progress",
            get(http::http_get_progress).delete(http::http_delete_progress),
        )
        .route(
            "/api/v1/learners/:learner/chapters/:chapter/theory",
            post(http::http_post_theory),
        )
        .route("/api/v1/learners/:learner/achievements", get(http::http_get_achievements))
        .route("/api/v1/learners/:learner/notifications", get(http::http_get_notifications))
        // Exercise sessions
        .route(&format!("{exercise}/session"), get(http::http_get_session))
        .route(&format!("{exercise}/answer"), put(http::http_put_answer))
        .route(&format!("{exercise}/submit"), post(http::http_post_submit))
        .route(&format!("{exercise}/reset"), post(http::http_post_reset))
        .route(&format!("{exercise}/hints"), post(http::http_post_hints))
        .route(&format!("{exercise}/progress"), delete(http::http_delete_exercise_progress))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
