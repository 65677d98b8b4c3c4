//! WebSocket upgrade + message loop. The learner is bound at upgrade time via
//! `/ws?learner=<id>`; each client message is parsed as JSON and forwarded to
//! core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    Query, State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use serde::Deserialize;
use tracing::{info, error, instrument, debug};

use crate::error::ApiError;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::logic;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
  pub learner: String,
}

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(
  ws: WebSocketUpgrade,
  State(state): State<Arc<AppState>>,
  Query(q): Query<WsQuery>,
) -> Result<impl IntoResponse, ApiError> {
  logic::check_learner(&q.learner)?;
  info!(target: "uml_trainer", learner = %q.learner, "WebSocket upgrade requested");
  Ok(ws.on_upgrade(move |socket| handle_ws(socket, state, q.learner)))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, learner: String) {
  info!(target: "uml_trainer", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "uml_trainer", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, &learner).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "uml_trainer", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "uml_trainer", "WebSocket disconnected");
}

/// Dispatch one client message for `learner`. Errors become `error` frames.
#[instrument(level = "info", skip(state))]
pub async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, learner: &str) -> ServerWsMessage {
  let reply = match msg {
    ClientWsMessage::Ping => Ok(ServerWsMessage::Pong),

    ClientWsMessage::SetAnswer { exercise_id, answer } => logic::set_answer(state, learner, &exercise_id, answer)
      .await
      .map(|session| ServerWsMessage::Session { session }),

    ClientWsMessage::Submit { exercise_id } => logic::submit(state, learner, &exercise_id).await.map(|out| {
      info!(target: "session", id = %exercise_id, correct = out.result.correct, "WS submit evaluated");
      ServerWsMessage::Submitted { result: out.result, unlocked: out.unlocked, session: out.session }
    }),

    ClientWsMessage::Reset { exercise_id } => logic::reset_session(state, learner, &exercise_id)
      .await
      .map(|session| ServerWsMessage::Session { session }),

    ClientWsMessage::ToggleHints { exercise_id } => logic::toggle_hints(state, learner, &exercise_id)
      .await
      .map(|h| ServerWsMessage::Hints { visible: h.visible, hints: h.hints }),

    ClientWsMessage::Progress => logic::progress(state, learner)
      .await
      .map(|progress| ServerWsMessage::Progress { progress }),

    ClientWsMessage::Notifications => logic::notifications(state, learner)
      .await
      .map(|unlocked| ServerWsMessage::Notifications { unlocked }),
  };

  reply.unwrap_or_else(|e| ServerWsMessage::Error { message: e.to_string() })
}
