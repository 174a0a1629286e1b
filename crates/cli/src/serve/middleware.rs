//! HTTP middleware: bearer-token authentication and role gates.

use std::sync::Arc;

use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prestasi_core::{Caller, Role};

use super::error::ApiError;
use super::state::AppState;
use crate::trust::token;

/// Verify `Authorization: Bearer <token>` and insert the resulting
/// [`Caller`] into request extensions.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok());
    let Some(raw) = header.and_then(|h| h.strip_prefix("Bearer ")) else {
        return ApiError::unauthorized("authentication required").into_response();
    };

    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    match token::verify(raw.trim(), &state.verifying_key, now) {
        Ok(claims) => {
            request.extensions_mut().insert(claims.into_caller());
            next.run(request).await
        }
        Err(e) => ApiError::unauthorized(e.to_string()).into_response(),
    }
}

async fn require_roles(
    roles: &[Role],
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let allowed = request
        .extensions()
        .get::<Caller>()
        .is_some_and(|c| c.has_role(roles));
    if allowed {
        next.run(request).await
    } else {
        ApiError::forbidden("role not permitted for this route").into_response()
    }
}

/// Verify, reject and bimbingan.
pub(crate) async fn require_verifier(request: Request<axum::body::Body>, next: Next) -> Response {
    require_roles(&[Role::Advisor, Role::Admin], request, next).await
}

/// `/admin/*`.
pub(crate) async fn require_admin(request: Request<axum::body::Body>, next: Next) -> Response {
    require_roles(&[Role::Admin], request, next).await
}
