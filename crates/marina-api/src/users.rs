use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use marina_db::is_unique_violation;
use marina_types::api::{DeletedUserResponse, RegisterUserRequest, UpdateUserRequest};
use marina_types::models::UserProfile;

use crate::auth::{AppState, blocking};
use crate::error::{ApiError, ApiJson, Result};
use crate::password::{HashCost, hash_password};
use crate::validation::{required_text, validate_email, validate_password};

struct NewUser {
    name: String,
    email: String,
    password: String,
}

/// All registration problems are reported together.
fn validate_new_user(req: RegisterUserRequest) -> Result<NewUser> {
    let name = required_text(req.name.as_deref(), "name");
    let email = validate_email(req.email.as_deref());
    let password = validate_password(req.password.as_deref());

    match (name, email, password) {
        (Ok(name), Ok(email), Ok(password)) => Ok(NewUser {
            name: name.to_string(),
            email,
            password: password.to_string(),
        }),
        (name, email, password) => {
            let problems: Vec<String> = [name.err(), email.err(), password.err()]
                .into_iter()
                .flatten()
                .collect();
            Err(ApiError::Validation(problems.join(" ")))
        }
    }
}

async fn hash_blocking(password: String, cost: HashCost) -> Result<String> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .context("password hashing task failed")??;
    Ok(hash)
}

fn email_conflict(err: anyhow::Error) -> ApiError {
    if is_unique_violation(&err) {
        ApiError::Conflict("email_taken")
    } else {
        ApiError::Internal(err)
    }
}

fn load_profile(state: &AppState, id: &str) -> Result<UserProfile> {
    let user = state.db.get_user_by_id(id)?.ok_or(ApiError::UserNotFound)?;
    Ok(user.into_profile()?)
}

/// Used by both the public registration route and the protected `POST /api/users`.
pub async fn create(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterUserRequest>,
) -> Result<impl IntoResponse> {
    let user = validate_new_user(req)?;
    let password_hash = hash_blocking(user.password, state.hash_cost).await?;

    let profile = blocking(&state, move |s| {
        let id = Uuid::new_v4().to_string();
        s.db.create_user(&id, &user.name, &user.email, &password_hash)
            .map_err(email_conflict)?;
        load_profile(s, &id)
    })
    .await?;

    info!("User {} registered as {}", profile.id, profile.email);
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<UserProfile>>> {
    let users = blocking(&state, |s| {
        let users = s
            .db
            .list_users()?
            .into_iter()
            .map(|row| row.into_profile())
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(users)
    })
    .await?;
    Ok(Json(users))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<UserProfile>> {
    let profile = blocking(&state, move |s| load_profile(s, &id)).await?;
    Ok(Json(profile))
}

/// Supplied fields are validated and replaced; absent ones are kept. The
/// password is re-hashed only when a new one is sent.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserProfile>> {
    if req.name.is_none() && req.email.is_none() && req.password.is_none() {
        return Err(ApiError::Validation(
            "Aucun champ à mettre à jour (name, email, password).".to_string(),
        ));
    }

    let name = req
        .name
        .as_deref()
        .map(|n| required_text(Some(n), "name").map(str::to_string))
        .transpose()
        .map_err(ApiError::Validation)?;
    let email = req
        .email
        .as_deref()
        .map(|e| validate_email(Some(e)))
        .transpose()
        .map_err(ApiError::Validation)?;
    let password = req
        .password
        .as_deref()
        .map(|p| validate_password(Some(p)))
        .transpose()
        .map_err(ApiError::Validation)?;

    let password_hash = match password {
        Some(p) => Some(hash_blocking(p.to_string(), state.hash_cost).await?),
        None => None,
    };

    let profile = blocking(&state, move |s| {
        let updated = s
            .db
            .update_user(&id, name.as_deref(), email.as_deref(), password_hash.as_deref())
            .map_err(email_conflict)?;
        if !updated {
            return Err(ApiError::UserNotFound);
        }
        load_profile(s, &id)
    })
    .await?;

    info!("User {} updated", profile.id);
    Ok(Json(profile))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedUserResponse>> {
    let name = {
        let id = id.clone();
        blocking(&state, move |s| s.db.delete_user(&id)?.ok_or(ApiError::UserNotFound)).await?
    };

    info!("User {} deleted", id);
    Ok(Json(DeletedUserResponse {
        message: "Utilisateur supprimé avec succès.".to_string(),
        name,
    }))
}
