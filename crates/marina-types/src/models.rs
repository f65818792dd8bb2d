use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A marina office operator, as exposed over the API.
/// The password hash never leaves the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Berth length category. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatwayType {
    Long,
    Short,
}

impl CatwayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }
}

impl fmt::Display for CatwayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCatwayType(pub String);

impl fmt::Display for UnknownCatwayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown catway type '{}' (expected 'long' or 'short')", self.0)
    }
}

impl std::error::Error for UnknownCatwayType {}

impl FromStr for CatwayType {
    type Err = UnknownCatwayType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "long" => Ok(Self::Long),
            "short" => Ok(Self::Short),
            other => Err(UnknownCatwayType(other.to_string())),
        }
    }
}

/// A berth. `catway_number` is unique across all catways.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catway {
    #[serde(rename = "_id")]
    pub id: String,
    pub catway_number: i64,
    #[serde(rename = "type")]
    pub kind: CatwayType,
    pub catway_state: String,
}

/// A boat booking against a berth.
///
/// `catway_number` is a snapshot taken when the reservation was created;
/// renumbering the catway later does not touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    #[serde(rename = "_id")]
    pub id: String,
    pub catway_number: i64,
    pub client_name: String,
    pub boat_name: String,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catway_type_parses_closed_set() {
        assert_eq!("long".parse::<CatwayType>(), Ok(CatwayType::Long));
        assert_eq!(" short ".parse::<CatwayType>(), Ok(CatwayType::Short));
        assert!("medium".parse::<CatwayType>().is_err());
        assert!("LONG".parse::<CatwayType>().is_err());
    }

    #[test]
    fn catway_wire_names() {
        let catway = Catway {
            id: "c1".into(),
            catway_number: 7,
            kind: CatwayType::Short,
            catway_state: "bon état".into(),
        };
        let json = serde_json::to_value(&catway).unwrap();
        assert_eq!(json["_id"], "c1");
        assert_eq!(json["catwayNumber"], 7);
        assert_eq!(json["type"], "short");
        assert_eq!(json["catwayState"], "bon état");
    }
}
