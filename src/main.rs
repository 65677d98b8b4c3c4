//! UML Trainer Backend
//!
//! - Axum HTTP + WebSocket API for UML diagram exercises
//! - Learner progress and achievements, in memory or on disk
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   TRAINER_CONFIG_PATH : path to TOML config (exercise bank, mastery targets, data dir)
//!   TRAINER_DATA_DIR    : directory for learner snapshots; overrides the config file
//!   TRAINER_MAX_LEARNERS: learners kept in memory at once (default 1024)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use uml_trainer::{build_router, telemetry, AppState};

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Catalogue, mastery targets and the persistence backend.
  let state = Arc::new(AppState::from_env());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "uml_trainer", %addr, exercises = state.catalog.len(), "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "uml_trainer", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "uml_trainer", error = %e, "Failed to listen for shutdown signal");
  }
}
