use std::sync::Arc;

use crate::services::doc_store::DocumentStore;
use crate::services::token_service::TokenVerifier;
use crate::ws::rooms::RoomRegistry;

/// Shared application state, injected into handlers via axum `State`.
pub struct AppState {
    pub rooms: Arc<RoomRegistry>,
    pub store: Arc<dyn DocumentStore>,
    pub verifier: Arc<dyn TokenVerifier>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            rooms: Arc::new(RoomRegistry::new()),
            store,
            verifier,
        }
    }
}
