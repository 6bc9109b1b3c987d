//! Push-then-pull sync engine.

use std::time::Instant;

use tokio::sync::Mutex;

use crate::config::SyncConfig;
use crate::db::TableRecord;
use crate::error::{Error, Result};
use crate::models::{Category, Expense, IncomeEntry};
use crate::remote::{HttpRemoteStore, RemoteStore};
use crate::services::LocalStore;

use super::natural_key::{KeyStrategies, Keyed};
use super::reconcile::{reconcile, Reconciled};
use super::report::{PullReport, PushOutcome, PushReport, RecordPush, SyncOutcome, SyncReport};
use super::status::{StatusChannel, SyncStatus, SyncTransition, Subscription};

const DEFAULT_FAILURE_WARN_THRESHOLD: u32 = 5;

/// Keeps a local store and a remote store in step.
///
/// One engine runs at most one sync at a time. Push always completes before
/// pull starts, so records created offline are on the remote store before
/// its changes come back.
pub struct SyncEngine<R> {
    store: LocalStore,
    remote: R,
    keys: KeyStrategies,
    status: StatusChannel,
    in_flight: Mutex<()>,
    failure_warn_threshold: u32,
}

impl<R> std::fmt::Debug for SyncEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("status", &self.status.current())
            .field("failure_warn_threshold", &self.failure_warn_threshold)
            .finish_non_exhaustive()
    }
}

impl SyncEngine<HttpRemoteStore> {
    /// Build an engine talking HTTP to the configured remote store.
    pub fn from_config(store: LocalStore, config: &SyncConfig) -> Result<Self> {
        let remote = HttpRemoteStore::new(config)?;
        Ok(Self::new(store, remote).with_failure_warn_threshold(config.failure_warn_threshold))
    }
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(store: LocalStore, remote: R) -> Self {
        Self {
            store,
            remote,
            keys: KeyStrategies::default(),
            status: StatusChannel::new(),
            in_flight: Mutex::new(()),
            failure_warn_threshold: DEFAULT_FAILURE_WARN_THRESHOLD,
        }
    }

    /// Replace the natural key strategies used for fallback matching.
    #[must_use]
    pub fn with_key_strategies(mut self, keys: KeyStrategies) -> Self {
        self.keys = keys;
        self
    }

    #[must_use]
    pub fn with_failure_warn_threshold(mut self, threshold: u32) -> Self {
        self.failure_warn_threshold = threshold.max(1);
        self
    }

    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Current status. Never waits on a running sync.
    pub fn status(&self) -> SyncStatus {
        self.status.current()
    }

    /// Observe status transitions.
    pub fn subscribe(
        &self,
        listener: impl Fn(SyncTransition) + Send + Sync + 'static,
    ) -> Subscription {
        self.status.subscribe(listener)
    }

    /// Push local changes, then pull remote changes.
    ///
    /// With `force`, the pull starts from the beginning of time instead of
    /// the stored cursor. Returns [`SyncOutcome::AlreadyRunning`] without
    /// doing anything if a sync is in progress.
    ///
    /// Individual push failures are reported in the outcome. Any other
    /// failure aborts the run, leaves the cursor untouched and moves the
    /// status to [`SyncStatus::Error`].
    pub async fn sync(&self, force: bool) -> Result<SyncOutcome> {
        let Ok(_in_flight) = self.in_flight.try_lock() else {
            tracing::debug!("Sync already in progress; skipping");
            return Ok(SyncOutcome::AlreadyRunning);
        };

        self.status.transition(SyncStatus::Syncing);
        let started = Instant::now();

        match self.run(force).await {
            Ok((push, pull)) => {
                let report = SyncReport {
                    push,
                    pull,
                    duration: started.elapsed(),
                };
                tracing::info!(
                    "Sync finished in {:?}: pushed {}, failed {}, pulled {}",
                    report.duration,
                    report.push.pushed(),
                    report.push.failed(),
                    report.pull.received
                );
                self.status.transition(SyncStatus::Idle);
                Ok(SyncOutcome::Completed(report))
            }
            Err(error) => {
                tracing::error!("Sync failed: {error}");
                self.status.transition(SyncStatus::Error);
                Err(error)
            }
        }
    }

    async fn run(&self, force: bool) -> Result<(PushReport, PullReport)> {
        let push = self.push().await?;
        let pull = self.pull(force).await?;
        Ok((push, pull))
    }

    async fn push(&self) -> Result<PushReport> {
        let mut report = PushReport::default();
        self.push_kind::<Category>(&mut report).await?;
        self.push_kind::<Expense>(&mut report).await?;
        self.push_kind::<IncomeEntry>(&mut report).await?;

        report.stuck = self
            .store
            .push_failures()
            .await?
            .into_iter()
            .filter(|failure| failure.attempts >= self.failure_warn_threshold)
            .collect();
        for failure in &report.stuck {
            tracing::warn!(
                "{} {} has failed to push {} times in a row: {}",
                failure.kind,
                failure.local_id,
                failure.attempts,
                failure.last_error
            );
        }

        tracing::info!(
            "Push phase: {} pushed, {} tombstones skipped, {} failed ({} rejected)",
            report.pushed(),
            report.skipped(),
            report.failed(),
            report.rejected()
        );
        Ok(report)
    }

    async fn push_kind<T: TableRecord>(&self, report: &mut PushReport) -> Result<()> {
        let records = self.store.unsynced::<T>().await?;
        if !records.is_empty() {
            tracing::debug!("Pushing {} dirty {} records", records.len(), T::KIND);
        }

        for record in records {
            let outcome = match self.push_record(&record).await {
                Ok(outcome) => outcome,
                Err(Error::Remote(error)) if !error.is_retryable() => {
                    tracing::error!(
                        "Remote store rejected {} {}: {error}; it stays dirty until fixed",
                        T::KIND,
                        record.id()
                    );
                    PushOutcome::Rejected(error.to_string())
                }
                Err(error) => {
                    tracing::warn!("Failed to push {} {}: {error}", T::KIND, record.id());
                    PushOutcome::Failed(error.to_string())
                }
            };

            match &outcome {
                PushOutcome::Failed(reason) | PushOutcome::Rejected(reason) => {
                    if let Err(error) = self
                        .store
                        .record_push_failure(T::KIND, record.id(), reason)
                        .await
                    {
                        tracing::warn!("Could not record push failure: {error}");
                    }
                }
                PushOutcome::Pushed | PushOutcome::SkippedTombstone => {
                    if let Err(error) = self.store.clear_push_failure(T::KIND, record.id()).await {
                        tracing::warn!("Could not clear push failure: {error}");
                    }
                }
            }

            report.records.push(RecordPush {
                kind: T::KIND,
                id: *record.id(),
                outcome,
            });
        }
        Ok(())
    }

    async fn push_record<T: TableRecord>(&self, record: &T) -> Result<PushOutcome> {
        let meta = record.meta();

        if meta.is_unpushed_tombstone() {
            self.store
                .mark_pushed::<T>(record.id(), None, meta.updated_at)
                .await?;
            tracing::debug!("Skipped unpushed tombstone {} {}", T::KIND, record.id());
            return Ok(PushOutcome::SkippedTombstone);
        }

        let created = self.remote.create(&record.to_payload()).await?;
        let remote_id = created.id.or_else(|| meta.remote_id.clone());
        self.store
            .mark_pushed::<T>(record.id(), remote_id.as_deref(), meta.updated_at)
            .await?;
        tracing::debug!(
            "Pushed {} {} as {}",
            T::KIND,
            record.id(),
            remote_id.as_deref().unwrap_or("<no remote id>")
        );
        Ok(PushOutcome::Pushed)
    }

    async fn pull(&self, force: bool) -> Result<PullReport> {
        let since = if force {
            0
        } else {
            self.store.cursor().await?.unwrap_or(0)
        };

        let changes = self.remote.changes_since(since).await?;
        tracing::info!(
            "Pulled {} remote changes since {since} (server time {:?})",
            changes.len(),
            changes.timestamp
        );

        let mut report = PullReport {
            since,
            received: changes.len(),
            ..PullReport::default()
        };
        self.reconcile_all::<Category>(&changes.categories, &mut report)
            .await?;
        self.reconcile_all::<Expense>(&changes.expenses, &mut report)
            .await?;
        self.reconcile_all::<IncomeEntry>(&changes.incomes, &mut report)
            .await?;

        if let Some(candidate) = changes.max_changed_at() {
            self.store.advance_cursor(candidate).await?;
        }
        report.cursor = self.store.cursor().await?;

        tracing::info!(
            "Pull phase: {} created, {} linked, {} kept local, {} unchanged",
            report.created,
            report.linked,
            report.kept_local,
            report.unchanged
        );
        Ok(report)
    }

    async fn reconcile_all<T: TableRecord + Keyed>(
        &self,
        remotes: &[T::Remote],
        report: &mut PullReport,
    ) -> Result<()> {
        let keys = &self.keys;
        for remote in remotes {
            let outcome = self
                .store
                .with_connection(|conn| reconcile::<T>(conn, remote, keys))
                .await?;

            match outcome {
                Reconciled::Created => report.created += 1,
                Reconciled::Linked => report.linked += 1,
                Reconciled::KeptLocal => report.kept_local += 1,
                Reconciled::Unchanged => report.unchanged += 1,
            }
        }
        Ok(())
    }
}
