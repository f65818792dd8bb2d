use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, header},
    middleware::Next,
    response::Response,
};

use crate::auth::AppState;
use crate::error::{ApiError, Result};
use crate::session::authorization_value;

pub const ACCESS_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-access-token");

/// Raw credential from `x-access-token`, falling back to `Authorization`.
pub fn credential(headers: &HeaderMap) -> Option<&str> {
    [&ACCESS_TOKEN_HEADER, &header::AUTHORIZATION]
        .into_iter()
        .filter_map(|name| headers.get(name))
        .filter_map(|v| v.to_str().ok())
        .find(|v| !v.trim().is_empty())
}

/// Validates the caller's token, exposes its claims to the handler and
/// answers with a freshly rotated token in the `Authorization` header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let rotation = state.sessions.check_and_rotate(credential(req.headers()))?;

    let value = HeaderValue::from_str(&authorization_value(&rotation.token))
        .map_err(|e| ApiError::Internal(e.into()))?;

    req.extensions_mut().insert(rotation.claims);
    let mut response = next.run(req).await;
    response.headers_mut().insert(header::AUTHORIZATION, value);
    Ok(response)
}
