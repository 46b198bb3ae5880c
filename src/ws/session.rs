use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::EditEvent;
use crate::state::AppState;
use crate::ws::admission::{self, ConnectParams};
use crate::ws::rooms::{ConnectionId, RelayFrame};

/// Lifecycle of one collaboration connection.
///
/// `Connecting → Admitted → Active → Closed`. Admission failure at any
/// point goes straight to `Closed`; `Closed` is terminal and every
/// transition out of it is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Admitted,
    Active,
    Closed,
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Connecting,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Admission checks passed.
    pub fn admit(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Admitted;
        }
    }

    /// Room join completed; events are relayed only in this state.
    pub fn activate(&mut self) {
        if self.state == SessionState::Admitted {
            self.state = SessionState::Active;
        }
    }

    /// Channel closed. Idempotent.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a relayed frame should be forwarded to this connection. The
/// sender never receives its own event back.
fn should_forward(frame: &RelayFrame, conn: ConnectionId) -> bool {
    frame.sender != conn
}

/// Drive one collaboration connection from handshake to cleanup.
pub async fn handle_socket(mut socket: WebSocket, params: ConnectParams, state: Arc<AppState>) {
    let mut session = Session::new();

    // Admission: one token verification and one document store lookup.
    // Any failure closes the socket with the matching policy frame and the
    // connection never touches a room.
    let admitted =
        match admission::admit(state.verifier.as_ref(), state.store.as_ref(), &params).await {
            Ok(admitted) => admitted,
            Err(e) => {
                info!("Admission refused: {}", e);
                let _ = socket.send(Message::Close(Some(e.close_frame()))).await;
                session.close();
                return;
            }
        };
    session.admit();

    let conn_id: ConnectionId = Uuid::new_v4();
    let mut room_rx = state.rooms.join(&admitted.doc_id, conn_id).await;
    session.activate();
    info!(
        "👤 User {} joined doc {} (connection {})",
        admitted.user_id, admitted.doc_id, conn_id
    );

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Read loop: validate each inbound envelope at the boundary and relay
    // it to the room. Malformed or unrecognized messages are dropped and
    // the connection stays open.
    let rooms = state.rooms.clone();
    let doc_id = admitted.doc_id.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            let msg = match msg {
                Message::Text(msg) => msg,
                Message::Close(_) => break,
                // Binary frames and control messages are not edit events.
                _ => continue,
            };
            let event: EditEvent = match serde_json::from_str(&msg) {
                Ok(event) => event,
                Err(e) => {
                    debug!("Dropping malformed message for doc {}: {}", doc_id, e);
                    continue;
                }
            };
            if event == EditEvent::Unknown {
                debug!("Dropping message of unrecognized kind for doc {}", doc_id);
                continue;
            }

            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    error!("Failed to serialize {} event for doc {}: {}", event.kind(), doc_id, e);
                    continue;
                }
            };
            rooms
                .relay(
                    &doc_id,
                    RelayFrame {
                        sender: conn_id,
                        payload,
                    },
                )
                .await;
        }
    });

    // Relay loop: forward frames from other room members to this client,
    // skipping our own echoes. A failed send means the channel is gone and
    // the loop ends.
    let mut relay_task = tokio::spawn(async move {
        loop {
            match room_rx.recv().await {
                Ok(frame) => {
                    if !should_forward(&frame, conn_id) {
                        continue;
                    }
                    if ws_tx.send(Message::Text(frame.payload)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Connection {} lagged, skipped {} frames", conn_id, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Either task finishing means the connection is done; finish the other.
    tokio::select! {
        _ = (&mut read_task) => relay_task.abort(),
        _ = (&mut relay_task) => read_task.abort(),
    };

    state.rooms.leave(&admitted.doc_id, conn_id).await;
    session.close();
    info!("👋 User {} left doc {}", admitted.user_id, admitted.doc_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::rooms::RoomRegistry;
    use serde_json::{json, Value};

    #[test]
    fn session_walks_connecting_to_closed() {
        let mut session = Session::new();
        assert_eq!(session.state(), SessionState::Connecting);
        session.admit();
        assert_eq!(session.state(), SessionState::Admitted);
        session.activate();
        assert_eq!(session.state(), SessionState::Active);
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn activate_requires_admission() {
        let mut session = Session::new();
        session.activate();
        assert_eq!(session.state(), SessionState::Connecting);
    }

    #[test]
    fn closed_is_terminal() {
        let mut session = Session::new();
        session.close();
        session.admit();
        session.activate();
        assert_eq!(session.state(), SessionState::Closed);
        // Double close is a no-op, not an error.
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn close_is_reachable_from_any_state() {
        let mut from_connecting = Session::new();
        from_connecting.close();
        assert_eq!(from_connecting.state(), SessionState::Closed);

        let mut from_admitted = Session::new();
        from_admitted.admit();
        from_admitted.close();
        assert_eq!(from_admitted.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn sender_never_receives_its_own_event() {
        let registry = RoomRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let mut rx_a = registry.join("doc1", a).await;
        let mut rx_b = registry.join("doc1", b).await;

        registry
            .relay(
                "doc1",
                RelayFrame {
                    sender: a,
                    payload: r#"{"type":"update","data":"<p>hi</p>","pageIndex":0}"#.to_string(),
                },
            )
            .await;

        // B's relay loop forwards the frame; A's suppresses it.
        let to_b = rx_b.recv().await.unwrap();
        assert!(should_forward(&to_b, b));
        let to_a = rx_a.recv().await.unwrap();
        assert!(!should_forward(&to_a, a));
    }

    #[tokio::test]
    async fn shared_user_receives_owner_update_verbatim() {
        let registry = RoomRegistry::new();
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();

        let _rx_u1 = registry.join("doc1", u1).await;
        let mut rx_u2 = registry.join("doc1", u2).await;

        // The read loop validates and re-serializes before relaying.
        let event: EditEvent =
            serde_json::from_str(r#"{"type":"update","data":"<p>hi</p>","pageIndex":0}"#).unwrap();
        let payload = serde_json::to_string(&event).unwrap();
        registry
            .relay(
                "doc1",
                RelayFrame {
                    sender: u1,
                    payload,
                },
            )
            .await;

        let received = rx_u2.recv().await.unwrap();
        let envelope: Value = serde_json::from_str(&received.payload).unwrap();
        assert_eq!(
            envelope,
            json!({"type": "update", "data": "<p>hi</p>", "pageIndex": 0})
        );
    }
}
