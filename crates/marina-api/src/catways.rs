use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use marina_db::is_unique_violation;
use marina_types::api::{CatwayRequest, MessageResponse};
use marina_types::models::{Catway, CatwayType};

use crate::auth::{AppState, blocking};
use crate::error::{ApiError, ApiJson, Result};
use crate::validation::required_text;

/// Validated, possibly partial, catway fields.
#[derive(Debug)]
struct CatwayFields {
    number: Option<i64>,
    kind: Option<CatwayType>,
    state: Option<String>,
}

impl CatwayFields {
    fn parse(req: CatwayRequest) -> Result<Self> {
        let mut problems = Vec::new();

        let number = match req.catway_number {
            Some(n) if n <= 0 => {
                problems.push("Le numéro de catway doit être un entier positif.".to_string());
                None
            }
            other => other,
        };

        let kind = match req.kind.as_deref().map(str::parse::<CatwayType>) {
            Some(Ok(kind)) => Some(kind),
            Some(Err(_)) => {
                problems.push("Le type doit être 'long' ou 'short'.".to_string());
                None
            }
            None => None,
        };

        let state = match req.catway_state.as_deref() {
            Some(raw) => match required_text(Some(raw), "catwayState") {
                Ok(state) => Some(state.to_string()),
                Err(msg) => {
                    problems.push(msg);
                    None
                }
            },
            None => None,
        };

        if !problems.is_empty() {
            return Err(ApiError::Validation(problems.join(" ")));
        }

        Ok(Self {
            number,
            kind,
            state,
        })
    }

    fn is_empty(&self) -> bool {
        self.number.is_none() && self.kind.is_none() && self.state.is_none()
    }

    fn complete(self) -> Result<(i64, CatwayType, String)> {
        match self {
            Self {
                number: Some(number),
                kind: Some(kind),
                state: Some(state),
            } => Ok((number, kind, state)),
            _ => Err(ApiError::Validation(
                "Les champs 'catwayNumber', 'type' et 'catwayState' sont requis.".to_string(),
            )),
        }
    }
}

fn number_conflict(err: anyhow::Error) -> ApiError {
    if is_unique_violation(&err) {
        ApiError::Conflict("catway_number_taken")
    } else {
        ApiError::Internal(err)
    }
}

/// Catway by identifier, or `CatwayNotFound`.
pub fn find_catway(state: &AppState, id: &str) -> Result<Catway> {
    let row = state.db.get_catway(id)?.ok_or(ApiError::CatwayNotFound)?;
    Ok(row.into_model()?)
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Catway>>> {
    let catways = blocking(&state, |s| {
        let catways = s
            .db
            .list_catways()?
            .into_iter()
            .map(|row| row.into_model())
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(catways)
    })
    .await?;
    Ok(Json(catways))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Catway>> {
    let catway = blocking(&state, move |s| find_catway(s, &id)).await?;
    Ok(Json(catway))
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CatwayRequest>,
) -> Result<impl IntoResponse> {
    let (number, kind, catway_state) = CatwayFields::parse(req)?.complete()?;

    let catway = blocking(&state, move |s| {
        let id = Uuid::new_v4().to_string();
        s.db.create_catway(&id, number, kind, &catway_state)
            .map_err(number_conflict)?;
        find_catway(s, &id)
    })
    .await?;

    info!("Catway {} created as number {}", catway.id, catway.catway_number);
    Ok((StatusCode::CREATED, Json(catway)))
}

/// Applies validated fields to an existing catway and returns the result.
async fn apply(state: &AppState, id: String, fields: CatwayFields) -> Result<Catway> {
    blocking(state, move |s| {
        let updated = s
            .db
            .update_catway(&id, fields.number, fields.kind, fields.state.as_deref())
            .map_err(number_conflict)?;
        if !updated {
            return Err(ApiError::CatwayNotFound);
        }
        find_catway(s, &id)
    })
    .await
}

/// Full replacement: every field must be supplied.
pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CatwayRequest>,
) -> Result<Json<Catway>> {
    let (number, kind, catway_state) = CatwayFields::parse(req)?.complete()?;
    let fields = CatwayFields {
        number: Some(number),
        kind: Some(kind),
        state: Some(catway_state),
    };

    let catway = apply(&state, id, fields).await?;
    info!("Catway {} replaced", catway.id);
    Ok(Json(catway))
}

pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CatwayRequest>,
) -> Result<Json<Catway>> {
    let fields = CatwayFields::parse(req)?;
    if fields.is_empty() {
        return Err(ApiError::Validation(
            "Aucun champ à mettre à jour (catwayNumber, type, catwayState).".to_string(),
        ));
    }

    let catway = apply(&state, id, fields).await?;
    info!("Catway {} patched", catway.id);
    Ok(Json(catway))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let deleted = {
        let id = id.clone();
        blocking(&state, move |s| Ok(s.db.delete_catway(&id)?)).await?
    };
    if !deleted {
        return Err(ApiError::CatwayNotFound);
    }

    info!("Catway {} deleted", id);
    Ok(Json(MessageResponse {
        message: "Catway supprimé avec succès.".to_string(),
    }))
}
