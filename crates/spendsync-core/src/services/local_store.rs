//! Shared local store wrapper used by the sync engine and clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::db::{
    count_unsynced, CursorStore, Database, PushFailure, SqliteCursorStore,
    SqlitePushFailureRepository, SqliteRecordRepository, TableRecord,
};
use crate::models::{Category, EntityKind, Expense, IncomeEntry, LocalId};
use crate::Result;

/// Thread-safe handle to the local database.
///
/// Clones share one connection; every operation holds the lock only for the
/// duration of its own statements.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl LocalStore {
    /// Open a store at the given filesystem path, creating parent directories.
    pub fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        tracing::debug!("Opened local store at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Filesystem location, `None` for in-memory stores.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run a closure against the connection while holding the lock.
    pub async fn with_connection<T>(
        &self,
        operation: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        let db = self.db.lock().await;
        operation(db.connection())
    }

    /// Insert a new record.
    pub async fn insert<T: TableRecord>(&self, record: &T) -> Result<()> {
        self.with_connection(|conn| SqliteRecordRepository::<T>::new(conn).insert(record))
            .await
    }

    /// Fetch a record by local id, tombstones included.
    pub async fn get<T: TableRecord>(&self, id: &LocalId) -> Result<Option<T>> {
        self.with_connection(|conn| SqliteRecordRepository::<T>::new(conn).get(id))
            .await
    }

    /// List records newest change first.
    pub async fn list<T: TableRecord>(&self, include_deleted: bool) -> Result<Vec<T>> {
        self.with_connection(|conn| SqliteRecordRepository::<T>::new(conn).list(include_deleted))
            .await
    }

    /// Apply a local edit and mark the record dirty.
    pub async fn update<T: TableRecord>(&self, record: &T) -> Result<T> {
        self.with_connection(|conn| SqliteRecordRepository::<T>::new(conn).update(record))
            .await
    }

    /// Soft-delete a record.
    pub async fn soft_delete<T: TableRecord>(&self, id: &LocalId) -> Result<()> {
        self.with_connection(|conn| SqliteRecordRepository::<T>::new(conn).soft_delete(id))
            .await
    }

    /// Soft-delete a record of a kind only known at runtime.
    pub async fn delete(&self, kind: EntityKind, id: &LocalId) -> Result<()> {
        match kind {
            EntityKind::Category => self.soft_delete::<Category>(id).await,
            EntityKind::Expense => self.soft_delete::<Expense>(id).await,
            EntityKind::Income => self.soft_delete::<IncomeEntry>(id).await,
        }
    }

    /// Records of one kind still waiting to be pushed.
    pub async fn unsynced<T: TableRecord>(&self) -> Result<Vec<T>> {
        self.with_connection(|conn| SqliteRecordRepository::<T>::new(conn).list_unsynced())
            .await
    }

    /// Record a successful push; see `SqliteRecordRepository::mark_pushed`.
    pub async fn mark_pushed<T: TableRecord>(
        &self,
        id: &LocalId,
        remote_id: Option<&str>,
        pushed_updated_at: i64,
    ) -> Result<()> {
        self.with_connection(|conn| {
            SqliteRecordRepository::<T>::new(conn).mark_pushed(id, remote_id, pushed_updated_at)
        })
        .await
    }

    pub async fn count_unsynced(&self, kind: EntityKind) -> Result<usize> {
        self.with_connection(|conn| count_unsynced(conn, kind)).await
    }

    /// Dirty records across all kinds.
    pub async fn pending_count(&self) -> Result<usize> {
        self.with_connection(|conn| {
            EntityKind::PUSH_ORDER
                .iter()
                .try_fold(0, |total, kind| -> Result<usize> {
                    Ok(total + count_unsynced(conn, *kind)?)
                })
        })
        .await
    }

    /// Stored pull cursor, `None` before the first successful pull.
    pub async fn cursor(&self) -> Result<Option<i64>> {
        self.with_connection(|conn| SqliteCursorStore::new(conn).load())
            .await
    }

    pub async fn advance_cursor(&self, cursor: i64) -> Result<()> {
        self.with_connection(|conn| SqliteCursorStore::new(conn).advance(cursor))
            .await
    }

    /// Count a failed push and return the consecutive failure total.
    pub async fn record_push_failure(
        &self,
        kind: EntityKind,
        id: &LocalId,
        error: &str,
    ) -> Result<u32> {
        self.with_connection(|conn| SqlitePushFailureRepository::new(conn).record(kind, id, error))
            .await
    }

    pub async fn clear_push_failure(&self, kind: EntityKind, id: &LocalId) -> Result<()> {
        self.with_connection(|conn| SqlitePushFailureRepository::new(conn).clear(kind, id))
            .await
    }

    /// Records whose pushes have been failing.
    pub async fn push_failures(&self) -> Result<Vec<PushFailure>> {
        self.with_connection(|conn| SqlitePushFailureRepository::new(conn).list())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn in_memory_insert_and_list_roundtrip() {
        let store = LocalStore::open_in_memory().unwrap();

        let expense = Expense::new("Lunch", 12.5, "2024-05-02").unwrap();
        store.insert(&expense).await.unwrap();

        let expenses: Vec<Expense> = store.list(false).await.unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].item_name, "Lunch");
        assert_eq!(store.pending_count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_dispatches_on_kind() {
        let store = LocalStore::open_in_memory().unwrap();

        let income = IncomeEntry::new("Salary", 3000.0, "2024-05-01").unwrap();
        store.insert(&income).await.unwrap();

        assert!(store.delete(EntityKind::Expense, &income.id).await.is_err());
        store.delete(EntityKind::Income, &income.id).await.unwrap();

        let stored: IncomeEntry = store.get(&income.id).await.unwrap().unwrap();
        assert!(stored.meta.is_deleted);
        assert!(store.list::<IncomeEntry>(false).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_path_creates_parent_directories() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("spendsync.db");

        let store = LocalStore::open_path(&path).unwrap();
        store.advance_cursor(42).await.unwrap();
        assert!(path.exists());
        assert_eq!(store.db_path(), Some(path.as_path()));

        drop(store);
        let reopened = LocalStore::open_path(&path).unwrap();
        assert_eq!(reopened.cursor().await.unwrap(), Some(42));
    }
}
