use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Applies pending migrations and returns the resulting schema version.
pub fn run(conn: &Connection) -> Result<i64> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let mut version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, catways, reservations)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE catways (
                id              TEXT PRIMARY KEY,
                catway_number   INTEGER NOT NULL UNIQUE,
                catway_type     TEXT NOT NULL CHECK (catway_type IN ('long', 'short')),
                catway_state    TEXT NOT NULL
            );

            -- catway_number is a snapshot, not a foreign key
            CREATE TABLE reservations (
                id              TEXT PRIMARY KEY,
                catway_number   INTEGER NOT NULL,
                client_name     TEXT NOT NULL,
                boat_name       TEXT NOT NULL,
                check_in        TEXT NOT NULL,
                check_out       TEXT NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_reservations_catway
                ON reservations(catway_number, check_in);

            INSERT INTO schema_version (version) VALUES (1);
            "
        )?;
        version = 1;
    }

    info!("Database migrations complete");
    Ok(version)
}
