//! Record repository implementation
//!
//! One generic repository serves every record table. Each record type lists
//! its business columns; sync metadata columns are shared by all tables.

use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::models::{
    Category, EntityKind, Expense, IncomeEntry, KeyValue, LocalId, Record, RecordKey, SyncMeta,
};
use crate::util::{now_millis, to_cents};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, Row};

const META_COLUMNS: &str = "remote_id, created_at, updated_at, synced, is_deleted";

/// A record stored in its own table.
pub trait TableRecord: Record {
    /// Business columns, in the order produced by `business_values`.
    const COLUMNS: &'static [&'static str];

    fn business_values(&self) -> Vec<Value>;

    /// Build a record from a row laid out as `id, COLUMNS..., metadata`.
    fn from_row(id: LocalId, meta: SyncMeta, row: &Row<'_>) -> rusqlite::Result<Self>;
}

fn optional_text(value: Option<&String>) -> Value {
    value.map_or(Value::Null, |text| Value::Text(text.clone()))
}

impl TableRecord for Expense {
    const COLUMNS: &'static [&'static str] =
        &["item_name", "amount", "category", "notes", "month", "date"];

    fn business_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.item_name.clone()),
            Value::Real(self.amount),
            optional_text(self.category.as_ref()),
            optional_text(self.notes.as_ref()),
            Value::Text(self.month.clone()),
            Value::Text(self.date.clone()),
        ]
    }

    fn from_row(id: LocalId, meta: SyncMeta, row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id,
            item_name: row.get(1)?,
            amount: row.get(2)?,
            category: row.get(3)?,
            notes: row.get(4)?,
            month: row.get(5)?,
            date: row.get(6)?,
            meta,
        })
    }
}

impl TableRecord for IncomeEntry {
    const COLUMNS: &'static [&'static str] = &["source", "amount", "notes", "month", "date"];

    fn business_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.source.clone()),
            Value::Real(self.amount),
            optional_text(self.notes.as_ref()),
            Value::Text(self.month.clone()),
            Value::Text(self.date.clone()),
        ]
    }

    fn from_row(id: LocalId, meta: SyncMeta, row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id,
            source: row.get(1)?,
            amount: row.get(2)?,
            notes: row.get(3)?,
            month: row.get(4)?,
            date: row.get(5)?,
            meta,
        })
    }
}

impl TableRecord for Category {
    const COLUMNS: &'static [&'static str] = &["name"];

    fn business_values(&self) -> Vec<Value> {
        vec![Value::Text(self.name.clone())]
    }

    fn from_row(id: LocalId, meta: SyncMeta, row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id,
            name: row.get(1)?,
            meta,
        })
    }
}

/// `SQLite` repository for one record table
pub struct SqliteRecordRepository<'a, T> {
    conn: &'a Connection,
    _record: PhantomData<fn() -> T>,
}

impl<'a, T: TableRecord> SqliteRecordRepository<'a, T> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            _record: PhantomData,
        }
    }

    fn table() -> &'static str {
        T::KIND.table()
    }

    fn select_sql(tail: &str) -> String {
        format!(
            "SELECT id, {}, {META_COLUMNS} FROM {} {tail}",
            T::COLUMNS.join(", "),
            Self::table()
        )
    }

    /// Parse a record from a database row
    fn parse_record(row: &Row<'_>) -> rusqlite::Result<T> {
        let id: String = row.get(0)?;
        let id = id.parse::<LocalId>().map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(error))
        })?;

        let base = T::COLUMNS.len();
        let meta = SyncMeta {
            remote_id: row.get(base + 1)?,
            created_at: row.get(base + 2)?,
            updated_at: row.get(base + 3)?,
            synced: row.get::<_, i64>(base + 4)? != 0,
            is_deleted: row.get::<_, i64>(base + 5)? != 0,
        };
        T::from_row(id, meta, row)
    }

    fn query(&self, tail: &str, values: Vec<Value>) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(&Self::select_sql(tail))?;
        let records = stmt
            .query_map(params_from_iter(values), Self::parse_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Insert a record exactly as given, metadata included
    pub fn insert(&self, record: &T) -> Result<()> {
        let placeholders = vec!["?"; T::COLUMNS.len() + 6].join(", ");
        let sql = format!(
            "INSERT INTO {} (id, {}, {META_COLUMNS}) VALUES ({placeholders})",
            Self::table(),
            T::COLUMNS.join(", ")
        );

        let meta = record.meta();
        let mut values = vec![Value::Text(record.id().as_str())];
        values.extend(record.business_values());
        values.extend([
            optional_text(meta.remote_id.as_ref()),
            Value::Integer(meta.created_at),
            Value::Integer(meta.updated_at),
            Value::Integer(i64::from(meta.synced)),
            Value::Integer(i64::from(meta.is_deleted)),
        ]);

        self.conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    /// Get a record by local ID, tombstones included
    pub fn get(&self, id: &LocalId) -> Result<Option<T>> {
        Ok(self
            .query("WHERE id = ?", vec![Value::Text(id.as_str())])?
            .into_iter()
            .next())
    }

    /// List records, newest change first
    pub fn list(&self, include_deleted: bool) -> Result<Vec<T>> {
        let tail = if include_deleted {
            "ORDER BY updated_at DESC"
        } else {
            "WHERE is_deleted = 0 ORDER BY updated_at DESC"
        };
        self.query(tail, Vec::new())
    }

    /// All records not yet acknowledged by the remote store, oldest first
    pub fn list_unsynced(&self) -> Result<Vec<T>> {
        self.query("WHERE synced = 0 ORDER BY created_at ASC, id ASC", Vec::new())
    }

    pub fn find_by_remote_id(&self, remote_id: &str) -> Result<Option<T>> {
        Ok(self
            .query(
                "WHERE remote_id = ?",
                vec![Value::Text(remote_id.to_string())],
            )?
            .into_iter()
            .next())
    }

    /// Records matching a natural key, oldest first.
    ///
    /// With `unlinked_only`, records that already carry a remote ID are
    /// excluded so an existing link is never overwritten.
    pub fn find_by_natural_key(&self, key: &RecordKey, unlinked_only: bool) -> Result<Vec<T>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }

        let mut clauses = Vec::with_capacity(key.parts().len() + 1);
        let mut values = Vec::with_capacity(key.parts().len());
        for (field, value) in key.parts() {
            if !T::COLUMNS.contains(field) {
                return Err(Error::InvalidInput(format!(
                    "'{field}' is not a {} column",
                    T::KIND
                )));
            }
            match value {
                KeyValue::Text(text) => {
                    clauses.push(format!("{field} = ?"));
                    values.push(Value::Text(text.clone()));
                }
                KeyValue::TextNoCase(text) => {
                    clauses.push(format!("{field} = ? COLLATE NOCASE"));
                    values.push(Value::Text(text.clone()));
                }
                KeyValue::Amount(amount) => {
                    clauses.push(format!("CAST(ROUND({field} * 100) AS INTEGER) = ?"));
                    values.push(Value::Integer(to_cents(*amount)));
                }
            }
        }
        if unlinked_only {
            clauses.push("remote_id IS NULL".to_string());
        }

        let tail = format!("WHERE {} ORDER BY created_at ASC, id ASC", clauses.join(" AND "));
        self.query(&tail, values)
    }

    /// Apply a local edit to the business fields.
    ///
    /// Bumps `updated_at` (never backwards) and marks the record dirty.
    pub fn update(&self, record: &T) -> Result<T> {
        let existing = self
            .get(record.id())?
            .filter(|existing| !existing.meta().is_deleted)
            .ok_or_else(|| Error::NotFound(record.id().to_string()))?;

        let updated_at = now_millis().max(existing.meta().updated_at + 1);
        let assignments = T::COLUMNS
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments}, updated_at = ?, synced = 0 WHERE id = ?",
            Self::table()
        );

        let mut values = record.business_values();
        values.push(Value::Integer(updated_at));
        values.push(Value::Text(record.id().as_str()));
        self.conn.execute(&sql, params_from_iter(values))?;

        self.get(record.id())?
            .ok_or_else(|| Error::NotFound(record.id().to_string()))
    }

    /// Soft delete a record; the tombstone syncs like any other edit
    pub fn soft_delete(&self, id: &LocalId) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET is_deleted = 1, synced = 0, updated_at = MAX(?, updated_at + 1)
             WHERE id = ? AND is_deleted = 0",
            Self::table()
        );
        let rows = self.conn.execute(&sql, params![now_millis(), id.as_str()])?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Record a successful push.
    ///
    /// The remote ID is stored whenever one is returned. The record is only
    /// marked synced if it was not edited again while the push was in flight.
    pub fn mark_pushed(
        &self,
        id: &LocalId,
        remote_id: Option<&str>,
        pushed_updated_at: i64,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET remote_id = COALESCE(?, remote_id),
                 synced = CASE WHEN updated_at = ? THEN 1 ELSE synced END
             WHERE id = ?",
            Self::table()
        );
        let rows = self
            .conn
            .execute(&sql, params![remote_id, pushed_updated_at, id.as_str()])?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Link a local record to its remote counterpart and adopt the remote
    /// tombstone state. Business fields are left untouched.
    pub fn link_remote(&self, id: &LocalId, remote_id: &str, is_deleted: bool) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET remote_id = ?, is_deleted = ?, synced = 1 WHERE id = ?",
            Self::table()
        );
        self.conn
            .execute(&sql, params![remote_id, i64::from(is_deleted), id.as_str()])?;
        Ok(())
    }

    /// Fill in the remote ID without changing sync state
    pub fn assign_remote_id(&self, id: &LocalId, remote_id: &str) -> Result<()> {
        let sql = format!("UPDATE {} SET remote_id = ? WHERE id = ?", Self::table());
        self.conn.execute(&sql, params![remote_id, id.as_str()])?;
        Ok(())
    }
}

/// Number of dirty records of one kind
pub fn count_unsynced(conn: &Connection, kind: EntityKind) -> Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE synced = 0", kind.table());
    let count = conn.query_row(&sql, [], |row| row.get::<_, usize>(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn coffee() -> Expense {
        Expense::new("Coffee", 120.0, "2024-05-01")
            .unwrap()
            .with_category("Food")
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup();
        let repo = SqliteRecordRepository::<Expense>::new(db.connection());

        let expense = coffee();
        repo.insert(&expense).unwrap();

        let fetched = repo.get(&expense.id).unwrap().unwrap();
        assert_eq!(fetched, expense);
    }

    #[test]
    fn test_list_excludes_tombstones_by_default() {
        let db = setup();
        let repo = SqliteRecordRepository::<Category>::new(db.connection());

        let food = Category::new("Food").unwrap();
        let rent = Category::new("Rent").unwrap();
        repo.insert(&food).unwrap();
        repo.insert(&rent).unwrap();
        repo.soft_delete(&rent.id).unwrap();

        assert_eq!(repo.list(false).unwrap().len(), 1);
        assert_eq!(repo.list(true).unwrap().len(), 2);

        // Tombstones stay in the table
        let tombstone = repo.get(&rent.id).unwrap().unwrap();
        assert!(tombstone.meta.is_deleted);
        assert!(!tombstone.meta.synced);
    }

    #[test]
    fn test_update_bumps_timestamp_and_marks_dirty() {
        let db = setup();
        let repo = SqliteRecordRepository::<Expense>::new(db.connection());

        let mut expense = coffee();
        expense.meta.synced = true;
        expense.meta.updated_at = i64::MAX / 2;
        repo.insert(&expense).unwrap();

        expense.amount = 150.0;
        let updated = repo.update(&expense).unwrap();
        assert_eq!(updated.amount, 150.0);
        assert!(!updated.meta.synced);
        assert_eq!(updated.meta.updated_at, i64::MAX / 2 + 1);
    }

    #[test]
    fn test_update_missing_record_fails() {
        let db = setup();
        let repo = SqliteRecordRepository::<Expense>::new(db.connection());
        assert!(matches!(repo.update(&coffee()), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_natural_key_matches_at_cent_precision() {
        let db = setup();
        let repo = SqliteRecordRepository::<Expense>::new(db.connection());

        let mut expense = Expense::new("Coffee", 0.1 + 0.2, "2024-05-01").unwrap();
        expense.meta.created_at = 1;
        repo.insert(&expense).unwrap();

        let key = RecordKey::new()
            .text("item_name", "Coffee")
            .text("date", "2024-05-01")
            .amount("amount", 0.3);
        let found = repo.find_by_natural_key(&key, true).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, expense.id);
    }

    #[test]
    fn test_natural_key_skips_linked_records_when_asked() {
        let db = setup();
        let repo = SqliteRecordRepository::<Expense>::new(db.connection());

        let mut linked = coffee();
        linked.meta.remote_id = Some("r-1".to_string());
        repo.insert(&linked).unwrap();

        let key = RecordKey::new().text("item_name", "Coffee");
        assert!(repo.find_by_natural_key(&key, true).unwrap().is_empty());
        assert_eq!(repo.find_by_natural_key(&key, false).unwrap().len(), 1);
        assert!(repo
            .find_by_natural_key(&RecordKey::new(), false)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_natural_key_rejects_unknown_columns() {
        let db = setup();
        let repo = SqliteRecordRepository::<Category>::new(db.connection());
        let key = RecordKey::new().text("name; DROP TABLE categories", "x");
        assert!(repo.find_by_natural_key(&key, false).is_err());
    }

    #[test]
    fn test_mark_pushed_keeps_concurrent_edit_dirty() {
        let db = setup();
        let repo = SqliteRecordRepository::<Expense>::new(db.connection());

        let expense = coffee();
        repo.insert(&expense).unwrap();
        let pushed_version = expense.meta.updated_at;

        // Edited again while the push was in flight
        let mut edited = expense.clone();
        edited.notes = Some("oat milk".to_string());
        repo.update(&edited).unwrap();

        repo.mark_pushed(&expense.id, Some("r-1"), pushed_version)
            .unwrap();
        let stored = repo.get(&expense.id).unwrap().unwrap();
        assert_eq!(stored.meta.remote_id.as_deref(), Some("r-1"));
        assert!(!stored.meta.synced);

        repo.mark_pushed(&expense.id, None, stored.meta.updated_at)
            .unwrap();
        let stored = repo.get(&expense.id).unwrap().unwrap();
        assert_eq!(stored.meta.remote_id.as_deref(), Some("r-1"));
        assert!(stored.meta.synced);
    }

    #[test]
    fn test_count_unsynced() {
        let db = setup();
        let repo = SqliteRecordRepository::<IncomeEntry>::new(db.connection());
        repo.insert(&IncomeEntry::new("Salary", 10.0, "2024-05-01").unwrap())
            .unwrap();

        assert_eq!(count_unsynced(db.connection(), EntityKind::Income).unwrap(), 1);
        assert_eq!(count_unsynced(db.connection(), EntityKind::Expense).unwrap(), 0);
    }
}
