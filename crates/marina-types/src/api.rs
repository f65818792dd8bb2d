use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// Identity carried by a session token. Rotation copies `sub` and `email`
/// verbatim and only resets `iat`/`exp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

// -- Auth --

// Request fields are optional so that a missing field surfaces as a
// validation error with our own body instead of a deserializer rejection.

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
}

// -- Users --

#[derive(Debug, Default, Deserialize)]
pub struct RegisterUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedUserResponse {
    pub message: String,
    pub name: String,
}

// -- Catways --

/// Body of catway create/replace/patch. Which fields are required depends on
/// the operation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatwayRequest {
    pub catway_number: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub catway_state: Option<String>,
}

// -- Reservations --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub client_name: Option<String>,
    pub boat_name: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
}

// -- Generic --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Body of every error response: a stable machine-readable code plus a
/// human-readable message.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}
