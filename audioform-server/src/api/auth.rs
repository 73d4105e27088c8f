//! Bearer token middleware for the reporting API
//!
//! When no `dashboard_token` is configured every request passes through.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::ApiError;
use crate::AppState;

pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.settings.dashboard_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected => Ok(next.run(request).await),
        Some(_) => {
            warn!("Rejected reporting request with wrong token: {}", request.uri());
            Err(ApiError::Unauthorized)
        }
        None => Err(ApiError::Unauthorized),
    }
}
