use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::state::AppState;
use crate::ws::admission::ConnectParams;
use crate::ws::session;

/// Handshake query parameters. Both are required for admission; absence is
/// reported over the socket with a policy close frame rather than an HTTP
/// rejection, so clients always get a distinguishable close code.
#[derive(Debug, Deserialize)]
pub struct CollabParams {
    #[serde(rename = "docId")]
    pub doc_id: Option<String>,
    pub token: Option<String>,
}

impl From<CollabParams> for ConnectParams {
    fn from(params: CollabParams) -> Self {
        ConnectParams {
            doc_id: params.doc_id,
            token: params.token,
        }
    }
}

/// Collaboration WebSocket endpoint
pub async fn collab_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<CollabParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("New collaboration connection attempt");
    ws.on_upgrade(move |socket| session::handle_socket(socket, params.into(), state))
}
