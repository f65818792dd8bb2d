use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error, warn};

use marina_types::api::ErrorBody;

/// Authentication failures. Deliberately coarse: callers learn whether a
/// credential was missing or unusable, never why it was unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("token_required")]
    TokenRequired,
    #[error("token_not_valid")]
    TokenInvalid,
    #[error("wrong_credentials")]
    WrongCredentials,
    #[error("invalid_session")]
    InvalidSession,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("check-out must be strictly after check-in")]
    InvalidInterval,

    #[error("catway and reservation identifiers are required")]
    MissingIdentifiers,

    #[error("User not found")]
    UserNotFound,

    #[error("Catway not found")]
    CatwayNotFound,

    #[error("Reservation not found")]
    ReservationNotFound,

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Conflict: {0}")]
    Conflict(&'static str),

    /// Unexpected failure on the login path, reported as 501.
    #[error("Login failure: {0}")]
    LoginUnavailable(anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidInterval | Self::MissingIdentifiers => {
                StatusCode::BAD_REQUEST
            }
            Self::UserNotFound | Self::CatwayNotFound | Self::ReservationNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::Auth(AuthError::WrongCredentials) => StatusCode::FORBIDDEN,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::LoginUnavailable(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable reason, safe to branch on.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::InvalidInterval => "invalid_interval",
            Self::MissingIdentifiers => "missing_identifiers",
            Self::UserNotFound => "user_not_found",
            Self::CatwayNotFound => "catway_not_found",
            Self::ReservationNotFound => "reservation_not_found",
            Self::Auth(AuthError::TokenRequired) => "token_required",
            Self::Auth(AuthError::TokenInvalid) => "token_not_valid",
            Self::Auth(AuthError::WrongCredentials) => "wrong_credentials",
            Self::Auth(AuthError::InvalidSession) => "invalid_session",
            Self::Conflict(code) => *code,
            Self::LoginUnavailable(_) => "authentication_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::InvalidInterval => {
                "La date de fin doit être postérieure à la date de début.".to_string()
            }
            Self::MissingIdentifiers => {
                "Veuillez fournir les IDs du catway et de la réservation.".to_string()
            }
            Self::UserNotFound => "Utilisateur non trouvé.".to_string(),
            Self::CatwayNotFound => "Catway non trouvé.".to_string(),
            Self::ReservationNotFound => "Réservation non trouvée.".to_string(),
            Self::Auth(AuthError::TokenRequired) => "Authentification requise.".to_string(),
            Self::Auth(AuthError::TokenInvalid) => "Jeton invalide ou expiré.".to_string(),
            Self::Auth(AuthError::WrongCredentials) => "Identifiants incorrects.".to_string(),
            Self::Auth(AuthError::InvalidSession) => "Session invalide ou expirée.".to_string(),
            Self::Conflict("email_taken") => "Cet email est déjà utilisé.".to_string(),
            Self::Conflict("catway_number_taken") => "Ce numéro de catway existe déjà.".to_string(),
            Self::Conflict(_) => "Conflit avec une ressource existante.".to_string(),
            Self::LoginUnavailable(_) => "Authentification momentanément impossible.".to_string(),
            Self::Internal(_) => "Erreur interne du serveur.".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::LoginUnavailable(e) | Self::Internal(e) => error!("{}: {:#}", self.code(), e),
            Self::Auth(e) => warn!("Rejected request: {}", e),
            other => debug!("Request failed: {}", other),
        }

        let body = ErrorBody {
            error: self.code().to_string(),
            message: self.public_message(),
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// `axum::Json` with rejections rendered as our own error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
