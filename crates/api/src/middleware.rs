use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use hana_models::{HanaError, User};
use tracing::debug;

/// `Authorization: Bearer <token>`; the scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// Resolves the bearer token to a live user and stores it in request extensions.
pub async fn require_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(HanaError::MissingToken)?;
    let user = state.auth.authenticate(&token).await?;
    debug!(user = %user.name, "Request authenticated");

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Must run inside `require_user`.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = req
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or(HanaError::MissingToken)?;
    state.auth.require_admin(&user).await?;
    Ok(next.run(req).await)
}
