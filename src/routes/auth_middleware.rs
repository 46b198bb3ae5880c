use axum::{
    extract::{Request, State},
    http::{self, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use std::sync::Arc;
use tracing::error;

use crate::models::ErrorResponse;
use crate::state::AppState;

/// Get the bearer token from a request's Authorization header
pub fn get_auth_token<B>(req: &http::Request<B>) -> Result<String, String> {
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;
    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header".to_string())?;
    Ok(auth_str
        .strip_prefix("Bearer ")
        .unwrap_or(auth_str)
        .to_string())
}

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    let status = StatusCode::UNAUTHORIZED;
    (
        status,
        Json(ErrorResponse {
            code: status.as_u16(),
            status: status.to_string(),
            error: message.to_string(),
        }),
    )
}

/// Require a valid session token on REST endpoints. The verified user id is
/// placed in request extensions for downstream handlers.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let token = match get_auth_token(&req) {
        Ok(token) => token,
        Err(e) => return Err(unauthorized(&e)),
    };

    let claims = match state.verifier.verify(&token) {
        Ok(claims) => claims,
        Err(e) => {
            error!("Token validation failed: {}", e);
            return Err(unauthorized("Invalid token"));
        }
    };

    req.extensions_mut().insert(claims.user_id);
    Ok(next.run(req).await)
}
