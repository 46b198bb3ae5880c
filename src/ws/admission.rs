use axum::extract::ws::CloseFrame;
use std::borrow::Cow;
use tracing::{error, info};

use crate::services::doc_store::DocumentStore;
use crate::services::token_service::TokenVerifier;

/// Policy violation close code (RFC 6455 1008).
pub const CLOSE_POLICY: u16 = 1008;
/// Internal error close code (RFC 6455 1011).
pub const CLOSE_SERVER_ERROR: u16 = 1011;

/// Connection parameters supplied on the handshake URL.
#[derive(Debug, Default)]
pub struct ConnectParams {
    pub doc_id: Option<String>,
    pub token: Option<String>,
}

/// A connection that passed every admission check, bound to the document
/// and verified user identity for its lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct Admitted {
    pub doc_id: String,
    pub user_id: String,
}

/// Why a connection attempt was refused. Each variant maps to the close
/// frame sent before the socket is dropped.
#[derive(Debug)]
pub enum AdmissionError {
    MissingParams,
    InvalidToken,
    DocumentNotFound,
    AccessDenied,
    Upstream(String),
}

impl AdmissionError {
    pub fn close_code(&self) -> u16 {
        match self {
            AdmissionError::Upstream(_) => CLOSE_SERVER_ERROR,
            _ => CLOSE_POLICY,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            AdmissionError::MissingParams => "Missing docId or token",
            AdmissionError::InvalidToken => "Invalid token",
            AdmissionError::DocumentNotFound => "Document not found",
            AdmissionError::AccessDenied => "Access denied",
            AdmissionError::Upstream(_) => "Server error",
        }
    }

    pub fn close_frame(&self) -> CloseFrame<'static> {
        CloseFrame {
            code: self.close_code(),
            reason: Cow::Borrowed(self.reason()),
        }
    }
}

impl std::fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionError::Upstream(e) => write!(f, "{}: {}", self.reason(), e),
            _ => write!(f, "{}", self.reason()),
        }
    }
}

/// Run the admission checks for a new connection attempt.
///
/// Verifies the token, then performs exactly one document store lookup to
/// confirm the document exists and the user owns it or appears in its
/// share list. The result is never cached: a reconnecting client re-runs
/// every check, and a token expiring mid-session does not evict the
/// connection it admitted.
pub async fn admit(
    verifier: &dyn TokenVerifier,
    store: &dyn DocumentStore,
    params: &ConnectParams,
) -> Result<Admitted, AdmissionError> {
    let (doc_id, token) = match (params.doc_id.as_deref(), params.token.as_deref()) {
        (Some(doc_id), Some(token)) if !doc_id.is_empty() && !token.is_empty() => (doc_id, token),
        _ => return Err(AdmissionError::MissingParams),
    };

    let claims = verifier.verify(token).map_err(|e| {
        info!("Token verification failed: {}", e);
        AdmissionError::InvalidToken
    })?;

    let access = store
        .find_document_with_shares(doc_id)
        .await
        .map_err(|e| {
            error!("Error finding document {}: {}", doc_id, e);
            AdmissionError::Upstream(e.to_string())
        })?
        .ok_or(AdmissionError::DocumentNotFound)?;

    if !access.grants_access(&claims.user_id) {
        return Err(AdmissionError::AccessDenied);
    }

    Ok(Admitted {
        doc_id: doc_id.to_string(),
        user_id: claims.user_id,
    })
}
