//! Database connection management

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

use super::migrations;

/// Database wrapper for the local `SQLite` store
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::initialize(conn)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        let database = Self { conn };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    /// Configure `SQLite` for optimal performance
    fn configure(&self) -> Result<()> {
        // In-memory databases report "memory" and keep their journal mode.
        self.conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))
            .ok();
        self.conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;
        self.conn.busy_timeout(Duration::from_secs(5))?;
        Ok(())
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn)
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let value: i64 = db
            .connection()
            .query_row("SELECT 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(value, 1);
    }

    #[test]
    fn test_open_file_persists_across_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("spendsync.db");

        {
            let db = Database::open(&path).unwrap();
            db.connection()
                .execute(
                    "INSERT INTO sync_state (key, value) VALUES ('probe', 42)",
                    [],
                )
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        let value: i64 = db
            .connection()
            .query_row("SELECT value FROM sync_state WHERE key = 'probe'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(value, 42);
    }
}
