//! Database migrations

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);

    Ok(version)
}

fn apply(conn: &Connection, version: i32, sql: &str) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(sql)?;
    tx.execute(
        "INSERT INTO schema_version (version) VALUES (?)",
        [version],
    )?;
    tx.commit()?;

    tracing::info!("Migrated database to version {version}");
    Ok(())
}

/// Migration to version 1: record tables and the cursor slot
fn migrate_v1(conn: &Connection) -> Result<()> {
    apply(
        conn,
        1,
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL COLLATE NOCASE,
            remote_id TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            synced INTEGER NOT NULL DEFAULT 0,
            is_deleted INTEGER NOT NULL DEFAULT 0
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_remote_id
            ON categories(remote_id) WHERE remote_id IS NOT NULL;
        CREATE INDEX IF NOT EXISTS idx_categories_synced ON categories(synced);
        CREATE INDEX IF NOT EXISTS idx_categories_name ON categories(name);

        CREATE TABLE IF NOT EXISTS expenses (
            id TEXT PRIMARY KEY,
            item_name TEXT NOT NULL,
            amount REAL NOT NULL,
            category TEXT,
            notes TEXT,
            month TEXT NOT NULL,
            date TEXT NOT NULL,
            remote_id TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            synced INTEGER NOT NULL DEFAULT 0,
            is_deleted INTEGER NOT NULL DEFAULT 0
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_expenses_remote_id
            ON expenses(remote_id) WHERE remote_id IS NOT NULL;
        CREATE INDEX IF NOT EXISTS idx_expenses_synced ON expenses(synced);
        CREATE INDEX IF NOT EXISTS idx_expenses_natural ON expenses(item_name, date);
        CREATE INDEX IF NOT EXISTS idx_expenses_month ON expenses(month);

        CREATE TABLE IF NOT EXISTS incomes (
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            amount REAL NOT NULL,
            notes TEXT,
            month TEXT NOT NULL,
            date TEXT NOT NULL,
            remote_id TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            synced INTEGER NOT NULL DEFAULT 0,
            is_deleted INTEGER NOT NULL DEFAULT 0
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_incomes_remote_id
            ON incomes(remote_id) WHERE remote_id IS NOT NULL;
        CREATE INDEX IF NOT EXISTS idx_incomes_synced ON incomes(synced);
        CREATE INDEX IF NOT EXISTS idx_incomes_natural ON incomes(source, date);

        -- Sync bookkeeping (local only)
        CREATE TABLE IF NOT EXISTS sync_state (
            key TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        );",
    )
}

/// Migration to version 2: push failure ledger
fn migrate_v2(conn: &Connection) -> Result<()> {
    apply(
        conn,
        2,
        "CREATE TABLE IF NOT EXISTS push_failures (
            entity TEXT NOT NULL,
            local_id TEXT NOT NULL,
            attempts INTEGER NOT NULL,
            last_error TEXT NOT NULL,
            last_attempt_at INTEGER NOT NULL,
            PRIMARY KEY (entity, local_id)
        );",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_migrations() {
        let conn = setup();
        run(&conn).unwrap();

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = setup();
        run(&conn).unwrap();
        run(&conn).unwrap(); // Should not fail

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn remote_id_is_unique_per_table() {
        let conn = setup();
        run(&conn).unwrap();

        let insert = "INSERT INTO categories (id, name, remote_id, created_at, updated_at)
                      VALUES (?, ?, ?, 0, 0)";
        conn.execute(insert, ["a", "Food", "r-1"]).unwrap();
        assert!(conn.execute(insert, ["b", "Rent", "r-1"]).is_err());

        // Unpushed records share the NULL remote id freely.
        conn.execute(
            "INSERT INTO categories (id, name, created_at, updated_at) VALUES ('c', 'Fun', 0, 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO categories (id, name, created_at, updated_at) VALUES ('d', 'Gym', 0, 0)",
            [],
        )
        .unwrap();
    }
}
