//! Stateless sessions: HS256 tokens that are verified and re-issued on every
//! protected request, so an active client keeps a sliding validity window.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use marina_types::api::Claims;

use crate::error::{ApiError, AuthError};

pub const DEFAULT_TOKEN_TTL: TimeDelta = TimeDelta::hours(24);

/// Scheme written in front of a rotated token in the `Authorization` response
/// header. Existing clients expect it glued to the token with no space.
pub const RESPONSE_SCHEME: &str = "Bearer";

/// Result of a successful gate check.
#[derive(Debug, Clone)]
pub struct Rotation {
    /// Claims decoded from the incoming token.
    pub claims: Claims,
    /// Fresh token carrying the same identity with a reset expiry.
    pub token: String,
}

#[derive(Clone)]
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    validity: TimeDelta,
}

impl SessionManager {
    pub fn new(secret: &str, validity: TimeDelta) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is enforced by verify_at with zero leeway
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            validity,
        }
    }

    pub fn validity(&self) -> TimeDelta {
        self.validity
    }

    pub fn issue_token(&self, user_id: &str, email: &str) -> anyhow::Result<String> {
        self.issue_token_at(user_id, email, Utc::now())
    }

    pub fn issue_token_at(&self, user_id: &str, email: &str, now: DateTime<Utc>) -> anyhow::Result<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.validity).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// A token is valid strictly before its `exp` second.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!("Token rejected: {}", e);
            AuthError::TokenInvalid
        })?;

        if now.timestamp() >= data.claims.exp {
            debug!("Token for {} expired at {}", data.claims.sub, data.claims.exp);
            return Err(AuthError::TokenInvalid);
        }

        Ok(data.claims)
    }

    pub fn check_and_rotate(&self, credential: Option<&str>) -> Result<Rotation, ApiError> {
        self.check_and_rotate_at(credential, Utc::now())
    }

    /// The protected-route gate: no credential is `TokenRequired`, an
    /// unusable one is `TokenInvalid`, a good one is swapped for a fresh token.
    pub fn check_and_rotate_at(
        &self,
        credential: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Rotation, ApiError> {
        let token = credential
            .map(strip_bearer)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::TokenRequired)?;

        let claims = self.verify_at(token, now)?;
        let token = self.issue_token_at(&claims.sub, &claims.email, now)?;

        Ok(Rotation { claims, token })
    }
}

/// Removes an optional `Bearer` scheme, with or without the separating space.
pub fn strip_bearer(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.get(..6) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => raw[6..].trim_start(),
        _ => raw,
    }
}

pub fn authorization_value(token: &str) -> String {
    format!("{RESPONSE_SCHEME}{token}")
}
