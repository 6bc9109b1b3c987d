//! Pull cursor persistence

use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};

const PULL_CURSOR_KEY: &str = "last_pull_cursor";

/// Storage for the incremental pull cursor
pub trait CursorStore {
    /// Load the cursor, `None` before the first successful pull
    fn load(&self) -> Result<Option<i64>>;

    /// Move the cursor forward. A value older than the stored one is ignored.
    fn advance(&self, cursor: i64) -> Result<()>;
}

/// `SQLite` implementation of `CursorStore`
pub struct SqliteCursorStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteCursorStore<'a> {
    /// Create a new store with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl CursorStore for SqliteCursorStore<'_> {
    fn load(&self) -> Result<Option<i64>> {
        let cursor = self
            .conn
            .query_row(
                "SELECT value FROM sync_state WHERE key = ?",
                [PULL_CURSOR_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(cursor)
    }

    fn advance(&self, cursor: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = MAX(value, excluded.value)",
            params![PULL_CURSOR_KEY, cursor],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_cursor_starts_empty() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteCursorStore::new(db.connection());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_cursor_never_moves_backwards() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteCursorStore::new(db.connection());

        store.advance(1_000).unwrap();
        assert_eq!(store.load().unwrap(), Some(1_000));

        store.advance(500).unwrap();
        assert_eq!(store.load().unwrap(), Some(1_000));

        store.advance(2_000).unwrap();
        assert_eq!(store.load().unwrap(), Some(2_000));
    }
}
