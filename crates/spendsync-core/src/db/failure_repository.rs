//! Push failure ledger
//!
//! Records whose push keeps failing stay dirty and are retried on every
//! sync. The ledger counts consecutive failures per record so callers can
//! surface records that never make it.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{EntityKind, LocalId};
use crate::util::{compact_text, now_millis};
use rusqlite::types::Type;
use rusqlite::Error::FromSqlConversionFailure;
use rusqlite::{params, Connection, Row};

/// Consecutive push failures for one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushFailure {
    pub kind: EntityKind,
    pub local_id: LocalId,
    pub attempts: u32,
    pub last_error: String,
    /// Unix ms of the last failed attempt
    pub last_attempt_at: i64,
}

/// `SQLite` repository for the push failure ledger
pub struct SqlitePushFailureRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqlitePushFailureRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Count one more failed attempt and return the running total
    pub fn record(&self, kind: EntityKind, id: &LocalId, error: &str) -> Result<u32> {
        let attempts = self.conn.query_row(
            "INSERT INTO push_failures (entity, local_id, attempts, last_error, last_attempt_at)
             VALUES (?1, ?2, 1, ?3, ?4)
             ON CONFLICT(entity, local_id) DO UPDATE SET
                 attempts = attempts + 1,
                 last_error = excluded.last_error,
                 last_attempt_at = excluded.last_attempt_at
             RETURNING attempts",
            params![kind.as_str(), id.as_str(), compact_text(error), now_millis()],
            |row| row.get(0),
        )?;
        Ok(attempts)
    }

    /// Forget failures for a record that has since been pushed
    pub fn clear(&self, kind: EntityKind, id: &LocalId) -> Result<()> {
        self.conn.execute(
            "DELETE FROM push_failures WHERE entity = ? AND local_id = ?",
            params![kind.as_str(), id.as_str()],
        )?;
        Ok(())
    }

    /// All recorded failures, most attempts first
    pub fn list(&self) -> Result<Vec<PushFailure>> {
        let mut stmt = self.conn.prepare(
            "SELECT entity, local_id, attempts, last_error, last_attempt_at
             FROM push_failures
             ORDER BY attempts DESC, last_attempt_at DESC",
        )?;

        let failures = stmt
            .query_map([], Self::parse_failure)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(failures)
    }

    fn parse_failure(row: &Row<'_>) -> rusqlite::Result<PushFailure> {
        let kind: String = row.get(0)?;
        let local_id: String = row.get(1)?;
        Ok(PushFailure {
            kind: kind
                .parse()
                .map_err(|error| FromSqlConversionFailure(0, Type::Text, Box::new(error)))?,
            local_id: local_id
                .parse()
                .map_err(|error| FromSqlConversionFailure(1, Type::Text, Box::new(error)))?,
            attempts: row.get(2)?,
            last_error: row.get(3)?,
            last_attempt_at: row.get(4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_counts_consecutive_failures() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqlitePushFailureRepository::new(db.connection());
        let id = LocalId::new();

        assert_eq!(repo.record(EntityKind::Expense, &id, "HTTP 500").unwrap(), 1);
        assert_eq!(repo.record(EntityKind::Expense, &id, "HTTP 502").unwrap(), 2);

        let failures = repo.list().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, EntityKind::Expense);
        assert_eq!(failures[0].local_id, id);
        assert_eq!(failures[0].attempts, 2);
        assert_eq!(failures[0].last_error, "HTTP 502");
    }

    #[test]
    fn test_clear_forgets_record() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqlitePushFailureRepository::new(db.connection());
        let id = LocalId::new();

        repo.record(EntityKind::Income, &id, "timeout").unwrap();
        repo.clear(EntityKind::Income, &id).unwrap();
        assert!(repo.list().unwrap().is_empty());

        // Failures are tracked per kind
        assert_eq!(repo.record(EntityKind::Category, &id, "x").unwrap(), 1);
    }
}
