use std::env;
use std::path::{Path, PathBuf};

use chrono::Utc;
use spendsync_core::{
    Category, EntityKind, Expense, IncomeEntry, LocalId, LocalStore, SyncConfig, SyncMeta,
};

use crate::error::CliError;

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    let from_env = || env::var_os("SPENDSYNC_DB_PATH").map(PathBuf::from);
    if let Some(path) = cli_db_path.or_else(from_env) {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    Ok(dirs::data_dir()
        .ok_or(CliError::NoDataDir)?
        .join("spendsync")
        .join("spendsync.db"))
}

pub fn open_store(path: &Path) -> Result<LocalStore, CliError> {
    Ok(LocalStore::open_path(path)?)
}

pub fn load_sync_config() -> Result<SyncConfig, CliError> {
    SyncConfig::from_env().map_err(CliError::from_config)
}

pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

pub fn normalize_record_identifier(id: &str) -> Result<String, CliError> {
    let id = id.trim();
    if id.is_empty() {
        Err(CliError::EmptyRecordId)
    } else {
        Ok(id.to_ascii_lowercase())
    }
}

async fn record_ids(store: &LocalStore, kind: EntityKind) -> Result<Vec<LocalId>, CliError> {
    let ids = match kind {
        EntityKind::Category => store
            .list::<Category>(true)
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect(),
        EntityKind::Expense => store
            .list::<Expense>(true)
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect(),
        EntityKind::Income => store
            .list::<IncomeEntry>(true)
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect(),
    };
    Ok(ids)
}

/// Resolve a full record ID or a unique prefix of one.
pub async fn resolve_record_id(
    kind: EntityKind,
    query: &str,
    store: &LocalStore,
) -> Result<LocalId, CliError> {
    let ids = record_ids(store, kind).await?;

    if let Ok(id) = query.parse::<LocalId>() {
        if ids.contains(&id) {
            return Ok(id);
        }
    }

    let matching = ids
        .into_iter()
        .filter(|id| id.as_str().starts_with(query))
        .collect::<Vec<_>>();

    match matching.as_slice() {
        [] => Err(CliError::RecordNotFound {
            kind: kind.to_string(),
            query: query.to_string(),
        }),
        [id] => Ok(*id),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|id| id.as_str().chars().take(13).collect::<String>())
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousRecordId(format!(
                "ID prefix '{query}' is ambiguous. Matches include: {options}"
            )))
        }
    }
}

pub fn short_id(id: &LocalId) -> String {
    id.as_str().chars().take(8).collect()
}

/// Sync marker shown next to each record.
pub fn sync_marker(meta: &SyncMeta) -> &'static str {
    match (meta.is_deleted, meta.synced) {
        (true, true) => "deleted",
        (true, false) => "deleted, pending",
        (false, true) => "synced",
        (false, false) => "pending",
    }
}

pub fn format_expense_lines(expenses: &[Expense]) -> Vec<String> {
    expenses
        .iter()
        .map(|expense| {
            let category = expense
                .category
                .as_deref()
                .map(|category| format!(" [{category}]"))
                .unwrap_or_default();
            format!(
                "{}  {}  {:>10.2}  {}{category}  ({})",
                short_id(&expense.id),
                expense.date,
                expense.amount,
                expense.item_name,
                sync_marker(&expense.meta)
            )
        })
        .collect()
}

pub fn format_income_lines(incomes: &[IncomeEntry]) -> Vec<String> {
    incomes
        .iter()
        .map(|income| {
            format!(
                "{}  {}  {:>10.2}  {}  ({})",
                short_id(&income.id),
                income.date,
                income.amount,
                income.source,
                sync_marker(&income.meta)
            )
        })
        .collect()
}

pub fn format_category_lines(categories: &[Category]) -> Vec<String> {
    categories
        .iter()
        .map(|category| {
            format!(
                "{}  {}  ({})",
                short_id(&category.id),
                category.name,
                sync_marker(&category.meta)
            )
        })
        .collect()
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}
