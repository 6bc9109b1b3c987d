//! Background sync loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::remote::RemoteStore;

use super::engine::SyncEngine;
use super::report::SyncOutcome;

/// Run `sync(false)` on `engine` every `period`, the first time one
/// period from now.
///
/// Failures are logged and the loop keeps going. Abort the returned handle
/// to stop it.
pub fn spawn_periodic_sync<R>(engine: Arc<SyncEngine<R>>, period: Duration) -> JoinHandle<()>
where
    R: RemoteStore + 'static,
{
    let period = period.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match engine.sync(false).await {
                Ok(SyncOutcome::Completed(report)) => {
                    tracing::debug!("Background sync completed in {:?}", report.duration);
                }
                Ok(SyncOutcome::AlreadyRunning) => {
                    tracing::debug!("Background sync skipped; another sync is running");
                }
                Err(error) => {
                    tracing::warn!("Background sync failed: {error}");
                }
            }
        }
    })
}
