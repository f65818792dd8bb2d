use crate::Database;
use crate::models::{CatwayRow, ReservationRow, UserRow, format_timestamp};
use anyhow::Result;
use chrono::{DateTime, Utc};
use marina_types::models::CatwayType;
use rusqlite::{OptionalExtension, Row};

const USER_COLUMNS: &str = "id, name, email, password, created_at, updated_at";
const CATWAY_COLUMNS: &str = "id, catway_number, catway_type, catway_state";
const RESERVATION_COLUMNS: &str =
    "id, catway_number, client_name, boat_name, check_in, check_out";

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, name: &str, email: &str, password_hash: &str) -> Result<()> {
        let now = format_timestamp(&Utc::now());
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                (id, name, email, password_hash, &now),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
            Ok(conn.query_row(&sql, [email], user_from_row).optional()?)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
            Ok(conn.query_row(&sql, [id], user_from_row).optional()?)
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY name, email");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Field-level update; `None` keeps the stored value. `password_hash` is
    /// only supplied when the caller changed the plaintext, so an unchanged
    /// password is never re-hashed. Returns false if no such user exists.
    pub fn update_user(
        &self,
        id: &str,
        name: Option<&str>,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<bool> {
        let now = format_timestamp(&Utc::now());
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                    name = COALESCE(?2, name),
                    email = COALESCE(?3, email),
                    password = COALESCE(?4, password),
                    updated_at = ?5
                 WHERE id = ?1",
                rusqlite::params![id, name, email, password_hash, now],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deletes a user and returns its display name, or `None` if absent.
    pub fn delete_user(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("DELETE FROM users WHERE id = ?1 RETURNING name", [id], |row| {
                    row.get(0)
                })
                .optional()?)
        })
    }

    // -- Catways --

    pub fn create_catway(
        &self,
        id: &str,
        catway_number: i64,
        kind: CatwayType,
        catway_state: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO catways (id, catway_number, catway_type, catway_state)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, catway_number, kind.as_str(), catway_state],
            )?;
            Ok(())
        })
    }

    pub fn get_catway(&self, id: &str) -> Result<Option<CatwayRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {CATWAY_COLUMNS} FROM catways WHERE id = ?1");
            Ok(conn.query_row(&sql, [id], catway_from_row).optional()?)
        })
    }

    pub fn get_catway_by_number(&self, catway_number: i64) -> Result<Option<CatwayRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {CATWAY_COLUMNS} FROM catways WHERE catway_number = ?1");
            Ok(conn.query_row(&sql, [catway_number], catway_from_row).optional()?)
        })
    }

    pub fn list_catways(&self) -> Result<Vec<CatwayRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {CATWAY_COLUMNS} FROM catways ORDER BY catway_number");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], catway_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Field-level update; `None` keeps the stored value.
    /// Returns false if no such catway exists.
    pub fn update_catway(
        &self,
        id: &str,
        catway_number: Option<i64>,
        kind: Option<CatwayType>,
        catway_state: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE catways SET
                    catway_number = COALESCE(?2, catway_number),
                    catway_type = COALESCE(?3, catway_type),
                    catway_state = COALESCE(?4, catway_state)
                 WHERE id = ?1",
                rusqlite::params![id, catway_number, kind.map(|k| k.as_str()), catway_state],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_catway(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM catways WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Reservations --

    pub fn insert_reservation(
        &self,
        id: &str,
        catway_number: i64,
        client_name: &str,
        boat_name: &str,
        check_in: &DateTime<Utc>,
        check_out: &DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reservations (id, catway_number, client_name, boat_name, check_in, check_out)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    id,
                    catway_number,
                    client_name,
                    boat_name,
                    format_timestamp(check_in),
                    format_timestamp(check_out),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_reservation(&self, id: &str) -> Result<Option<ReservationRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = ?1");
            Ok(conn.query_row(&sql, [id], reservation_from_row).optional()?)
        })
    }

    pub fn list_reservations(&self) -> Result<Vec<ReservationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {RESERVATION_COLUMNS} FROM reservations ORDER BY check_in, catway_number"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], reservation_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_reservations_for_catway(&self, catway_number: i64) -> Result<Vec<ReservationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {RESERVATION_COLUMNS} FROM reservations
                 WHERE catway_number = ?1
                 ORDER BY check_in"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([catway_number], reservation_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_reservation(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM reservations WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn catway_from_row(row: &Row<'_>) -> rusqlite::Result<CatwayRow> {
    Ok(CatwayRow {
        id: row.get(0)?,
        catway_number: row.get(1)?,
        catway_type: row.get(2)?,
        catway_state: row.get(3)?,
    })
}

fn reservation_from_row(row: &Row<'_>) -> rusqlite::Result<ReservationRow> {
    Ok(ReservationRow {
        id: row.get(0)?,
        catway_number: row.get(1)?,
        client_name: row.get(2)?,
        boat_name: row.get(3)?,
        check_in: row.get(4)?,
        check_out: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unique_violation;
    use chrono::TimeZone;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn user_update_keeps_password_unless_supplied() {
        let db = db();
        db.create_user("u1", "Alice", "alice@port.fr", "$argon2id$hash-1").unwrap();

        assert!(db.update_user("u1", Some("Alice B."), None, None).unwrap());
        let row = db.get_user_by_id("u1").unwrap().unwrap();
        assert_eq!(row.name, "Alice B.");
        assert_eq!(row.password, "$argon2id$hash-1");

        assert!(db.update_user("u1", None, None, Some("$argon2id$hash-2")).unwrap());
        let row = db.get_user_by_email("alice@port.fr").unwrap().unwrap();
        assert_eq!(row.password, "$argon2id$hash-2");

        assert!(!db.update_user("missing", Some("x"), None, None).unwrap());
    }

    #[test]
    fn duplicate_email_is_a_unique_violation() {
        let db = db();
        db.create_user("u1", "Alice", "alice@port.fr", "h").unwrap();
        let err = db.create_user("u2", "Other", "alice@port.fr", "h").unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn delete_user_returns_name() {
        let db = db();
        db.create_user("u1", "Alice", "alice@port.fr", "h").unwrap();
        assert_eq!(db.delete_user("u1").unwrap().as_deref(), Some("Alice"));
        assert_eq!(db.delete_user("u1").unwrap(), None);
    }

    #[test]
    fn catway_number_is_unique() {
        let db = db();
        db.create_catway("c1", 1, CatwayType::Long, "ok").unwrap();
        let err = db.create_catway("c2", 1, CatwayType::Short, "ok").unwrap_err();
        assert!(is_unique_violation(&err));

        db.create_catway("c2", 2, CatwayType::Short, "ok").unwrap();
        let err = db.update_catway("c2", Some(1), None, None).unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn catway_partial_update() {
        let db = db();
        db.create_catway("c1", 4, CatwayType::Long, "bon état").unwrap();
        assert!(db.update_catway("c1", None, None, Some("planche cassée")).unwrap());

        let catway = db.get_catway("c1").unwrap().unwrap().into_model().unwrap();
        assert_eq!(catway.catway_number, 4);
        assert_eq!(catway.kind, CatwayType::Long);
        assert_eq!(catway.catway_state, "planche cassée");
        assert!(db.get_catway_by_number(4).unwrap().is_some());
    }

    #[test]
    fn reservation_timestamps_roundtrip_through_text() {
        let db = db();
        let check_in = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let check_out = Utc.with_ymd_and_hms(2025, 1, 15, 12, 30, 0).unwrap();
        db.insert_reservation("r1", 12, "John Doe", "Sea Breeze", &check_in, &check_out)
            .unwrap();

        let reservation = db.get_reservation("r1").unwrap().unwrap().into_model().unwrap();
        assert_eq!(reservation.check_in, check_in);
        assert_eq!(reservation.check_out, check_out);
        assert_eq!(db.list_reservations_for_catway(12).unwrap().len(), 1);
        assert!(db.list_reservations_for_catway(13).unwrap().is_empty());

        assert!(db.delete_reservation("r1").unwrap());
        assert!(!db.delete_reservation("r1").unwrap());
    }
}
