//! Merging pulled records into the local store.

use rusqlite::Connection;

use crate::db::{SqliteRecordRepository, TableRecord};
use crate::error::Result;
use crate::remote::RemoteRecord;

use super::natural_key::{KeyStrategies, Keyed};

/// What reconciling one pulled record did to the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// No local counterpart; a new synced record was inserted.
    Created,
    /// A local counterpart was linked to the remote id and marked synced.
    Linked,
    /// The local counterpart has a newer unpushed edit and stays dirty.
    KeptLocal,
    /// Nothing to change.
    Unchanged,
}

/// Reconcile one pulled record inside its own transaction.
pub fn reconcile<T>(
    conn: &Connection,
    remote: &T::Remote,
    keys: &KeyStrategies,
) -> Result<Reconciled>
where
    T: TableRecord + Keyed,
{
    let tx = conn.unchecked_transaction()?;
    let outcome = reconcile_in::<T>(&tx, remote, keys)?;
    tx.commit()?;
    Ok(outcome)
}

fn reconcile_in<T>(
    conn: &Connection,
    remote: &T::Remote,
    keys: &KeyStrategies,
) -> Result<Reconciled>
where
    T: TableRecord + Keyed,
{
    let repo = SqliteRecordRepository::<T>::new(conn);
    let remote_id = remote.remote_id();
    let incoming = T::from_remote(remote)?;

    let local = match repo.find_by_remote_id(remote_id)? {
        Some(local) => Some(local),
        None => fallback_match(&repo, &incoming, keys)?,
    };

    let Some(local) = local else {
        repo.insert(&incoming)?;
        tracing::debug!("Created local {} for remote {remote_id}", T::KIND);
        return Ok(Reconciled::Created);
    };

    if T::APPEND_ONLY {
        return Ok(Reconciled::Unchanged);
    }

    let meta = local.meta();
    if !meta.synced && meta.updated_at > incoming.meta().updated_at {
        if meta.remote_id.is_none() {
            repo.assign_remote_id(local.id(), remote_id)?;
        }
        tracing::debug!(
            "Kept pending local edit of {} {} over remote {remote_id}",
            T::KIND,
            local.id()
        );
        return Ok(Reconciled::KeptLocal);
    }

    if meta.synced
        && meta.remote_id.as_deref() == Some(remote_id)
        && meta.is_deleted == remote.is_deleted()
    {
        return Ok(Reconciled::Unchanged);
    }

    repo.link_remote(local.id(), remote_id, remote.is_deleted())?;
    tracing::debug!("Linked {} {} to remote {remote_id}", T::KIND, local.id());
    Ok(Reconciled::Linked)
}

/// Find a local record matching the natural key of `incoming`.
///
/// Only records without a remote id are considered, except for append-only
/// kinds where the natural key alone defines identity. A record already
/// linked to another remote id is never re-pointed, so the same offline entry
/// pushed from two devices ends up as two records; push runs before pull, so
/// most local records are already linked when such a copy arrives.
fn fallback_match<T>(
    repo: &SqliteRecordRepository<'_, T>,
    incoming: &T,
    keys: &KeyStrategies,
) -> Result<Option<T>>
where
    T: TableRecord + Keyed,
{
    let key = T::strategy(keys).natural_key(incoming);
    let mut candidates = repo.find_by_natural_key(&key, !T::APPEND_ONLY)?;

    if candidates.len() > 1 {
        tracing::warn!(
            "{} local {} records match remote {}; using the oldest",
            candidates.len(),
            T::KIND,
            incoming.meta().remote_id.as_deref().unwrap_or_default()
        );
    }

    Ok((!candidates.is_empty()).then(|| candidates.remove(0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{Category, Expense};
    use crate::remote::{RemoteCategory, RemoteExpense};
    use crate::sync::natural_key::NoFallback;

    fn remote_expense(id: &str, updated_at: i64) -> RemoteExpense {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "itemName": "Coffee",
            "amount": 4.5,
            "date": "2024-05-01",
            "createdAt": 1_000,
            "updatedAt": updated_at,
        }))
        .unwrap()
    }

    fn remote_category(id: &str, name: &str) -> RemoteCategory {
        serde_json::from_value(serde_json::json!({ "_id": id, "name": name })).unwrap()
    }

    fn reconcile_expense(
        db: &Database,
        remote: &RemoteExpense,
        keys: &KeyStrategies,
    ) -> Reconciled {
        reconcile::<Expense>(db.connection(), remote, keys).unwrap()
    }

    fn repo(db: &Database) -> SqliteRecordRepository<'_, Expense> {
        SqliteRecordRepository::new(db.connection())
    }

    #[test]
    fn creates_when_nothing_matches() {
        let db = Database::open_in_memory().unwrap();
        let keys = KeyStrategies::default();

        let outcome = reconcile_expense(&db, &remote_expense("r-1", 2_000), &keys);
        assert_eq!(outcome, Reconciled::Created);

        let stored = repo(&db).find_by_remote_id("r-1").unwrap().unwrap();
        assert!(stored.meta.synced);
        assert_eq!(stored.meta.updated_at, 2_000);
        assert_eq!(stored.month, "2024-05");
    }

    #[test]
    fn second_pull_of_same_record_is_unchanged() {
        let db = Database::open_in_memory().unwrap();
        let keys = KeyStrategies::default();
        let remote = remote_expense("r-1", 2_000);

        reconcile::<Expense>(db.connection(), &remote, &keys).unwrap();
        let outcome = reconcile::<Expense>(db.connection(), &remote, &keys).unwrap();
        assert_eq!(outcome, Reconciled::Unchanged);
        assert_eq!(repo(&db).list(true).unwrap().len(), 1);
    }

    #[test]
    fn links_offline_record_by_natural_key() {
        let db = Database::open_in_memory().unwrap();
        let keys = KeyStrategies::default();

        let mut local = Expense::new("Coffee", 4.5, "2024-05-01").unwrap();
        local.notes = Some("local note".to_string());
        local.meta.updated_at = 1_500;
        repo(&db).insert(&local).unwrap();

        let outcome = reconcile_expense(&db, &remote_expense("r-1", 2_000), &keys);
        assert_eq!(outcome, Reconciled::Linked);

        let stored = repo(&db).get(&local.id).unwrap().unwrap();
        assert_eq!(stored.meta.remote_id.as_deref(), Some("r-1"));
        assert!(stored.meta.synced);
        // Business fields are never overwritten
        assert_eq!(stored.notes.as_deref(), Some("local note"));
    }

    #[test]
    fn linked_record_is_not_repointed_by_natural_key() {
        let db = Database::open_in_memory().unwrap();
        let keys = KeyStrategies::default();

        reconcile_expense(&db, &remote_expense("r-1", 2_000), &keys);
        let outcome = reconcile_expense(&db, &remote_expense("r-2", 2_100), &keys);
        assert_eq!(outcome, Reconciled::Created);

        let first = repo(&db).find_by_remote_id("r-1").unwrap().unwrap();
        let second = repo(&db).find_by_remote_id("r-2").unwrap().unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(repo(&db).list(true).unwrap().len(), 2);
    }

    #[test]
    fn newer_local_edit_stays_dirty() {
        let db = Database::open_in_memory().unwrap();
        let keys = KeyStrategies::default();

        let mut local = Expense::new("Coffee", 4.5, "2024-05-01").unwrap();
        local.meta.updated_at = 9_000;
        repo(&db).insert(&local).unwrap();

        let outcome = reconcile_expense(&db, &remote_expense("r-1", 2_000), &keys);
        assert_eq!(outcome, Reconciled::KeptLocal);

        let stored = repo(&db).get(&local.id).unwrap().unwrap();
        assert_eq!(stored.meta.remote_id.as_deref(), Some("r-1"));
        assert!(!stored.meta.synced);
        assert_eq!(stored.meta.updated_at, 9_000);
    }

    #[test]
    fn disabled_fallback_creates_duplicate() {
        let db = Database::open_in_memory().unwrap();
        let keys = KeyStrategies::default().with_expenses(NoFallback);

        repo(&db)
            .insert(&Expense::new("Coffee", 4.5, "2024-05-01").unwrap())
            .unwrap();
        let outcome = reconcile_expense(&db, &remote_expense("r-1", 2_000), &keys);
        assert_eq!(outcome, Reconciled::Created);
        assert_eq!(repo(&db).list(true).unwrap().len(), 2);
    }

    #[test]
    fn categories_are_never_updated() {
        let db = Database::open_in_memory().unwrap();
        let keys = KeyStrategies::default();

        let local = Category::new("Food").unwrap();
        SqliteRecordRepository::<Category>::new(db.connection())
            .insert(&local)
            .unwrap();

        let outcome =
            reconcile::<Category>(db.connection(), &remote_category("c-1", "FOOD"), &keys).unwrap();
        assert_eq!(outcome, Reconciled::Unchanged);

        let outcome =
            reconcile::<Category>(db.connection(), &remote_category("c-2", "Rent"), &keys).unwrap();
        assert_eq!(outcome, Reconciled::Created);

        let categories = SqliteRecordRepository::<Category>::new(db.connection())
            .list(true)
            .unwrap();
        assert_eq!(categories.len(), 2);
        let food = categories.iter().find(|category| category.id == local.id).unwrap();
        assert_eq!(food.name, "Food");
        assert!(food.meta.remote_id.is_none());
    }
}
