//! Database schema migrations for todomine.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Schema version after all migrations have run.
pub const CURRENT_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Current schema version, 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    }) {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: todos, single-user game stats, key-value store.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS todos (
            id           TEXT PRIMARY KEY,
            title        TEXT NOT NULL,
            description  TEXT NOT NULL DEFAULT '',
            priority     TEXT NOT NULL DEFAULT 'medium',
            category     TEXT NOT NULL DEFAULT 'other',
            completed    INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL,
            completed_at TEXT
        );

        CREATE TABLE IF NOT EXISTS game_stats (
            user_id               TEXT PRIMARY KEY,
            level                 INTEGER NOT NULL DEFAULT 1,
            coins                 INTEGER NOT NULL DEFAULT 0,
            mining_power          INTEGER NOT NULL DEFAULT 1,
            auto_miners           INTEGER NOT NULL DEFAULT 0,
            auto_mining_rate      REAL NOT NULL DEFAULT 0,
            total_todos_completed INTEGER NOT NULL DEFAULT 0,
            current_streak        INTEGER NOT NULL DEFAULT 0,
            best_streak           INTEGER NOT NULL DEFAULT 0,
            last_activity         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_todos_created_at ON todos(created_at);
        CREATE INDEX IF NOT EXISTS idx_todos_completed ON todos(completed);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: tracked efficiency level, streak timestamps, achievements.
///
/// Efficiency was not stored before v2; existing rows start at level 0.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "ALTER TABLE game_stats ADD COLUMN efficiency_level INTEGER NOT NULL DEFAULT 0;
         ALTER TABLE game_stats ADD COLUMN last_completion_at TEXT;

         CREATE TABLE IF NOT EXISTS achievements (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            unlocked_at TEXT NOT NULL
         );",
    )?;

    // Rate used to be miners * 1.0 regardless of efficiency purchases.
    tx.execute(
        "UPDATE game_stats SET auto_mining_rate = auto_miners * 1.0",
        [],
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn v1_database_is_upgraded_in_place() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        conn.execute(
            "INSERT INTO game_stats (user_id, auto_miners, auto_mining_rate, last_activity)
             VALUES ('default_user', 2, 3.375, '2024-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();

        migrate(&conn).unwrap();

        let (eff, rate): (i64, f64) = conn
            .query_row(
                "SELECT efficiency_level, auto_mining_rate FROM game_stats",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(eff, 0);
        assert_eq!(rate, 2.0);
    }
}
