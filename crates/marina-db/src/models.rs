//! Database row types. These map directly to SQLite rows and stay distinct
//! from the marina-types API models; `into_model` does the conversion.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use marina_types::models::{Catway, CatwayType, Reservation, UserProfile};

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct CatwayRow {
    pub id: String,
    pub catway_number: i64,
    pub catway_type: String,
    pub catway_state: String,
}

pub struct ReservationRow {
    pub id: String,
    pub catway_number: i64,
    pub client_name: String,
    pub boat_name: String,
    pub check_in: String,
    pub check_out: String,
}

impl UserRow {
    pub fn into_profile(self) -> Result<UserProfile> {
        Ok(UserProfile {
            created_at: parse_timestamp(&self.created_at)
                .with_context(|| format!("corrupt created_at on user {}", self.id))?,
            updated_at: parse_timestamp(&self.updated_at)
                .with_context(|| format!("corrupt updated_at on user {}", self.id))?,
            id: self.id,
            name: self.name,
            email: self.email,
        })
    }
}

impl CatwayRow {
    pub fn into_model(self) -> Result<Catway> {
        Ok(Catway {
            kind: self
                .catway_type
                .parse::<CatwayType>()
                .with_context(|| format!("corrupt catway_type on catway {}", self.id))?,
            id: self.id,
            catway_number: self.catway_number,
            catway_state: self.catway_state,
        })
    }
}

impl ReservationRow {
    pub fn into_model(self) -> Result<Reservation> {
        Ok(Reservation {
            check_in: parse_timestamp(&self.check_in)
                .with_context(|| format!("corrupt check_in on reservation {}", self.id))?,
            check_out: parse_timestamp(&self.check_out)
                .with_context(|| format!("corrupt check_out on reservation {}", self.id))?,
            id: self.id,
            catway_number: self.catway_number,
            client_name: self.client_name,
            boat_name: self.boat_name,
        })
    }
}

/// Timestamps are stored as RFC 3339 text in UTC.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}
