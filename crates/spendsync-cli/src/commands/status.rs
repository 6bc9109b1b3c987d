use std::path::Path;

use serde::Serialize;
use spendsync_core::db::PushFailure;
use spendsync_core::EntityKind;

use crate::commands::common::{format_sync_timestamp, load_sync_config, open_store, short_id};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct PendingCounts {
    pub categories: usize,
    pub expenses: usize,
    pub incomes: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub db_path: String,
    pub sync_configured: bool,
    pub cursor: Option<i64>,
    pub pending: PendingCounts,
    pub push_failures: Vec<PushFailure>,
    /// Attempts after which a failing record counts as stuck.
    pub failure_warn_threshold: Option<u32>,
}

pub async fn run_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let config = load_sync_config().ok();
    let store = open_store(db_path)?;

    let summary = StatusSummary {
        db_path: db_path.display().to_string(),
        sync_configured: config.is_some(),
        cursor: store.cursor().await?,
        pending: PendingCounts {
            categories: store.count_unsynced(EntityKind::Category).await?,
            expenses: store.count_unsynced(EntityKind::Expense).await?,
            incomes: store.count_unsynced(EntityKind::Income).await?,
        },
        push_failures: store.push_failures().await?,
        failure_warn_threshold: config.map(|config| config.failure_warn_threshold),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for line in format_status_lines(&summary) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn format_status_lines(summary: &StatusSummary) -> Vec<String> {
    let mut lines = vec![format!("Database: {}", summary.db_path)];

    if !summary.sync_configured {
        lines.push("Sync: not configured (set SPENDSYNC_API_URL)".to_string());
    }
    lines.push(summary.cursor.map_or_else(
        || "Last pull: never".to_string(),
        |cursor| format!("Last pull: changes up to {}", format_sync_timestamp(cursor)),
    ));

    let pending = &summary.pending;
    lines.push(format!(
        "Pending: {} categories, {} expenses, {} incomes",
        pending.categories, pending.expenses, pending.incomes
    ));

    for failure in &summary.push_failures {
        let stuck = summary
            .failure_warn_threshold
            .is_some_and(|threshold| failure.attempts >= threshold);
        lines.push(format!(
            "  {} {} {} failed {} times: {}",
            if stuck { "stuck" } else { "retrying" },
            failure.kind,
            short_id(&failure.local_id),
            failure.attempts,
            failure.last_error
        ));
    }
    lines
}
