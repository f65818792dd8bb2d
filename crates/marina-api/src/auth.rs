use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};
use tracing::{debug, error, info};

use marina_db::Database;
use marina_types::api::{LoginRequest, LoginResponse};
use marina_types::models::UserProfile;

use crate::error::{ApiError, ApiJson, AuthError, Result};
use crate::middleware::credential;
use crate::password::{HashCost, verify_password};
use crate::session::{SessionManager, authorization_value, strip_bearer};
use crate::validation::{normalize_email, required_text};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub sessions: SessionManager,
    pub hash_cost: HashCost,
}

/// Runs store access, and anything else that blocks, on tokio's blocking pool
/// so the mutex-guarded connection never stalls an executor thread.
pub async fn blocking<T, F>(state: &AppState, f: F) -> Result<T>
where
    F: FnOnce(&AppState) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
}

/// Checks an email/password pair and returns a fresh session token.
/// This is the only place a plaintext password is compared.
pub async fn authenticate(state: &AppState, email: &str, password: &str) -> Result<String> {
    let email = normalize_email(email);
    let password = password.to_string();

    let user = blocking(state, move |s| {
        let user = s
            .db
            .get_user_by_email(&email)?
            .ok_or(ApiError::UserNotFound)?;
        if !verify_password(&password, &user.password) {
            return Err(AuthError::WrongCredentials.into());
        }
        Ok(user)
    })
    .await?;

    let token = state.sessions.issue_token(&user.id, &user.email)?;
    info!("User {} authenticated", user.id);
    Ok(token)
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse> {
    let email = required_text(req.email.as_deref(), "email").map_err(ApiError::Validation)?;
    let password = match req.password.as_deref() {
        Some(p) if !p.is_empty() => p,
        _ => return Err(ApiError::Validation("Le champ 'password' est requis.".to_string())),
    };

    let token = authenticate(&state, email, password)
        .await
        .map_err(|e| match e {
            ApiError::Internal(inner) => ApiError::LoginUnavailable(inner),
            other => other,
        })?;

    Ok((
        [(header::AUTHORIZATION, authorization_value(&token))],
        Json(LoginResponse {
            message: "Authentification réussie".to_string(),
            token,
        }),
    ))
}

/// Profile of the token holder. Read-only: no rotation happens here.
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<UserProfile>> {
    let token = credential(&headers)
        .map(strip_bearer)
        .ok_or(AuthError::InvalidSession)?;

    let claims = state.sessions.verify(token).map_err(|e| {
        debug!("Session lookup refused: {}", e);
        AuthError::InvalidSession
    })?;

    let profile = blocking(&state, move |s| {
        let user = s
            .db
            .get_user_by_id(&claims.sub)?
            .ok_or(ApiError::UserNotFound)?;
        Ok(user.into_profile()?)
    })
    .await?;

    Ok(Json(profile))
}
