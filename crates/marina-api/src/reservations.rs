//! Reservations hang off a catway in the URL, but are stored with a copy of
//! the catway number taken at creation time rather than a live reference.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use marina_types::api::{CreateReservationRequest, MessageResponse};
use marina_types::models::{Catway, Reservation};

use crate::auth::{AppState, blocking};
use crate::catways::find_catway;
use crate::error::{ApiError, ApiJson, Result};
use crate::validation::required_text;

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Accepts RFC 3339, a zone-less `YYYY-MM-DDTHH:MM[:SS[.f]]` read as UTC, or a
/// bare date meaning midnight UTC.
///
/// Fractions of a second are dropped: the store keeps whole seconds, and the
/// interval check has to see the same values that get persisted.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    parse_any(raw.trim()).map(|ts| ts.trunc_subsecs(0))
}

fn parse_any(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A stay must end strictly after it starts.
pub fn validate_interval(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> Result<()> {
    if check_out > check_in {
        Ok(())
    } else {
        Err(ApiError::InvalidInterval)
    }
}

/// Request body after the required-field checks. The interval itself is
/// checked later, once the catway is known to exist.
#[derive(Debug)]
struct NewReservation {
    client_name: String,
    boat_name: String,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
}

impl NewReservation {
    fn parse(req: CreateReservationRequest) -> Result<Self> {
        let mut problems = Vec::new();

        let mut text = |value: Option<&str>, field: &str| match required_text(value, field) {
            Ok(v) => Some(v.to_string()),
            Err(msg) => {
                problems.push(msg);
                None
            }
        };
        let client_name = text(req.client_name.as_deref(), "clientName");
        let boat_name = text(req.boat_name.as_deref(), "boatName");
        let check_in = text(req.check_in.as_deref(), "checkIn");
        let check_out = text(req.check_out.as_deref(), "checkOut");

        let mut timestamp = |value: Option<String>, field: &str| -> Option<DateTime<Utc>> {
            let raw = value?;
            let parsed = parse_timestamp(&raw);
            if parsed.is_none() {
                problems.push(format!("Le champ '{field}' n'est pas une date valide."));
            }
            parsed
        };
        let check_in = timestamp(check_in, "checkIn");
        let check_out = timestamp(check_out, "checkOut");

        match (client_name, boat_name, check_in, check_out) {
            (Some(client_name), Some(boat_name), Some(check_in), Some(check_out)) => Ok(Self {
                client_name,
                boat_name,
                check_in,
                check_out,
            }),
            _ => Err(ApiError::Validation(problems.join(" "))),
        }
    }
}

fn ensure_identifiers(catway_id: &str, reservation_id: &str) -> Result<()> {
    if catway_id.trim().is_empty() || reservation_id.trim().is_empty() {
        return Err(ApiError::MissingIdentifiers);
    }
    Ok(())
}

fn find_reservation(state: &AppState, id: &str) -> Result<Reservation> {
    let row = state
        .db
        .get_reservation(id)?
        .ok_or(ApiError::ReservationNotFound)?;
    Ok(row.into_model()?)
}

/// Catway first, then the reservation by its own identifier. The two are not
/// required to match.
fn resolve(state: &AppState, catway_id: &str, reservation_id: &str) -> Result<(Catway, Reservation)> {
    ensure_identifiers(catway_id, reservation_id)?;
    let catway = find_catway(state, catway_id)?;
    let reservation = find_reservation(state, reservation_id)?;

    if reservation.catway_number != catway.catway_number {
        debug!(
            "Reservation {} was booked on catway number {}, accessed through catway {} (number {})",
            reservation.id, reservation.catway_number, catway.id, catway.catway_number
        );
    }

    Ok((catway, reservation))
}

pub async fn create(
    State(state): State<AppState>,
    Path(catway_id): Path<String>,
    ApiJson(req): ApiJson<CreateReservationRequest>,
) -> Result<impl IntoResponse> {
    let details = NewReservation::parse(req)?;

    let reservation = blocking(&state, move |s| {
        let catway = find_catway(s, &catway_id)?;
        validate_interval(details.check_in, details.check_out)?;

        let id = Uuid::new_v4().to_string();
        s.db.insert_reservation(
            &id,
            catway.catway_number,
            &details.client_name,
            &details.boat_name,
            &details.check_in,
            &details.check_out,
        )?;
        find_reservation(s, &id)
    })
    .await?;

    info!(
        "Reservation {} created on catway number {} for {}",
        reservation.id, reservation.catway_number, reservation.boat_name
    );
    Ok((StatusCode::CREATED, Json(reservation)))
}

pub async fn get(
    State(state): State<AppState>,
    Path((catway_id, reservation_id)): Path<(String, String)>,
) -> Result<Json<Reservation>> {
    let (_, reservation) =
        blocking(&state, move |s| resolve(s, &catway_id, &reservation_id)).await?;
    Ok(Json(reservation))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((catway_id, reservation_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>> {
    let id = blocking(&state, move |s| {
        let (_, reservation) = resolve(s, &catway_id, &reservation_id)?;
        if !s.db.delete_reservation(&reservation.id)? {
            // removed concurrently between lookup and delete
            return Err(ApiError::ReservationNotFound);
        }
        Ok(reservation.id)
    })
    .await?;

    info!("Reservation {} deleted", id);
    Ok(Json(MessageResponse {
        message: "Réservation supprimée avec succès.".to_string(),
    }))
}

/// Reservations whose snapshot matches the catway's current number.
pub async fn list_for_catway(
    State(state): State<AppState>,
    Path(catway_id): Path<String>,
) -> Result<Json<Vec<Reservation>>> {
    let reservations = blocking(&state, move |s| {
        let catway = find_catway(s, &catway_id)?;
        let reservations = s
            .db
            .list_reservations_for_catway(catway.catway_number)?
            .into_iter()
            .map(|row| row.into_model())
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(reservations)
    })
    .await?;
    Ok(Json(reservations))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Reservation>>> {
    let reservations = blocking(&state, |s| {
        let reservations = s
            .db
            .list_reservations()?
            .into_iter()
            .map(|row| row.into_model())
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(reservations)
    })
    .await?;
    Ok(Json(reservations))
}
