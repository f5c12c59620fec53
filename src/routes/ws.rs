//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.
//! Sessions created over a connection are removed when it closes.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::error::MockTestError;
use crate::protocol::{ClientWsMessage, ServerWsMessage, SessionView};
use crate::logic::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "mocktest_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "mocktest_backend", "WebSocket connected");
  let mut owned: Vec<String> = Vec::new();
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "mocktest_backend", "WS received: {:?}", std::mem::discriminant(&incoming));
            handle_client_ws(incoming, &state, &mut owned).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "mocktest_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  release_sessions(&state, &owned).await;
  info!(target: "mocktest_backend", "WebSocket disconnected");
}

/// Remove the sessions a closed connection created.
async fn release_sessions(state: &AppState, ids: &[String]) {
  let mut removed = 0usize;
  for id in ids {
    if state.remove_session(id).await {
      removed += 1;
    }
  }
  debug!(target: "mocktest_backend", owned = ids.len(), removed, "WS sessions released");
}

fn session_reply(result: Result<SessionView, MockTestError>) -> ServerWsMessage {
  match result {
    Ok(session) => ServerWsMessage::Session { session },
    Err(e) => ServerWsMessage::Error { message: e.user_message() },
  }
}

#[instrument(level = "info", skip(msg, state, owned))]
pub(crate) async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, owned: &mut Vec<String>) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::CreateSession => {
      let session = create_session(state).await;
      owned.push(session.session_id.clone());
      ServerWsMessage::Session { session }
    }

    ClientWsMessage::GetSession { session_id } => session_reply(get_session(state, &session_id).await),

    ClientWsMessage::GenerateTest { session_id, request } => {
      let result = generate_test(state, &session_id, request).await;
      info!(target: "mock_test", id = %session_id, ok = result.is_ok(), "WS generate_test handled");
      session_reply(result)
    }

    ClientWsMessage::SubmitAnswers { session_id, answers } => {
      let result = submit_answers(state, &session_id, &answers).await;
      info!(target: "mock_test", id = %session_id, ok = result.is_ok(), "WS submit_answers handled");
      session_reply(result)
    }

    ClientWsMessage::ResetSession { session_id } => session_reply(reset_session(state, &session_id).await),

    ClientWsMessage::TutorMessage { text, subject, grade_level } => {
      let text = tutor_reply(state, &text, subject.as_deref(), grade_level.as_deref()).await;
      ServerWsMessage::TutorReply { text }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AgentConfig;

  #[tokio::test]
  async fn ws_dispatch_maps_errors_to_user_messages() {
    let state = AppState::with_service(AgentConfig::default(), None);
    let mut owned = Vec::new();
    let reply = handle_client_ws(ClientWsMessage::ResetSession { session_id: "missing".into() }, &state, &mut owned).await;
    match reply {
      ServerWsMessage::Error { message } => assert!(message.contains("no longer exists")),
      other => panic!("unexpected reply {other:?}"),
    }

    let reply = handle_client_ws(ClientWsMessage::CreateSession, &state, &mut owned).await;
    let json = serde_json::to_value(&reply).unwrap();
    assert_eq!(json["type"], "session");
    assert_eq!(json["session"]["stage"], "configuring");
  }

  #[tokio::test]
  async fn closing_a_connection_drops_its_sessions_only() {
    let state = AppState::with_service(AgentConfig::default(), None);
    let other = state.create_session().await;

    let mut owned = Vec::new();
    handle_client_ws(ClientWsMessage::CreateSession, &state, &mut owned).await;
    handle_client_ws(ClientWsMessage::CreateSession, &state, &mut owned).await;
    assert_eq!(owned.len(), 2);
    assert_eq!(state.sessions.read().await.len(), 3);

    release_sessions(&state, &owned).await;
    let sessions = state.sessions.read().await;
    assert_eq!(sessions.len(), 1);
    assert!(sessions.contains_key(&other.id));
  }
}
