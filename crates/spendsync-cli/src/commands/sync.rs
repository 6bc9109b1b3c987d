use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use spendsync_core::sync::PushOutcome;
use spendsync_core::{spawn_periodic_sync, SyncEngine, SyncOutcome, SyncReport};

use crate::commands::common::{format_sync_timestamp, load_sync_config, open_store, short_id};
use crate::error::CliError;

const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(60);

pub async fn run_sync(
    force: bool,
    watch: bool,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let config = load_sync_config()?;
    let store = open_store(db_path)?;
    let engine = Arc::new(SyncEngine::from_config(store, &config)?);

    let outcome = engine.sync(force).await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        for line in format_sync_outcome(&outcome) {
            println!("{line}");
        }
    }

    if watch {
        let period = config.sync_interval.unwrap_or(DEFAULT_WATCH_INTERVAL);
        let _subscription = engine.subscribe(|transition| {
            tracing::info!("Sync status: {} -> {}", transition.from, transition.to);
        });

        println!(
            "Syncing every {}s. Press Ctrl+C to stop.",
            period.as_secs().max(1)
        );
        let handle = spawn_periodic_sync(Arc::clone(&engine), period);
        tokio::signal::ctrl_c().await?;
        handle.abort();
    }

    Ok(())
}

pub fn format_sync_outcome(outcome: &SyncOutcome) -> Vec<String> {
    match outcome {
        SyncOutcome::Completed(report) => format_sync_report(report),
        SyncOutcome::AlreadyRunning => vec!["Sync already in progress".to_string()],
    }
}

pub fn format_sync_report(report: &SyncReport) -> Vec<String> {
    let push = &report.push;
    let pull = &report.pull;

    let mut lines = vec![format!(
        "Pushed {} records ({} deleted before sync, {} failed)",
        push.pushed(),
        push.skipped(),
        push.failed()
    )];
    for (record, reason) in push.failures() {
        let label = match record.outcome {
            PushOutcome::Rejected(_) => "rejected",
            _ => "failed",
        };
        lines.push(format!(
            "  {label} {} {}: {reason}",
            record.kind,
            short_id(&record.id)
        ));
    }
    for failure in &push.stuck {
        lines.push(format!(
            "  stuck {} {} after {} attempts",
            failure.kind,
            short_id(&failure.local_id),
            failure.attempts
        ));
    }

    lines.push(format!(
        "Pulled {} changes: {} created, {} linked, {} kept local, {} unchanged",
        pull.received, pull.created, pull.linked, pull.kept_local, pull.unchanged
    ));
    if let Some(cursor) = pull.cursor {
        lines.push(format!("Up to date as of {}", format_sync_timestamp(cursor)));
    }
    lines
}
