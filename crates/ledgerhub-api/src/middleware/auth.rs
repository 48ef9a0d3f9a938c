//! Session middleware

use crate::error::ApiError;
use crate::ApiState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use ledgerhub_tenant::SessionGuard;
use std::sync::Arc;

/// Decode the bearer session and bind it to the request tenant.
///
/// The accepted [`Session`](ledgerhub_tenant::Session) is available to
/// handlers as a request extension.
pub async fn require_session(
    State(state): State<Arc<ApiState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let session = state.sessions.from_header(header);

    SessionGuard::check_current(&session)?;

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}
