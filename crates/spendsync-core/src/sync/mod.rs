//! Bidirectional sync between the local store and the remote store.

mod engine;
mod natural_key;
mod reconcile;
mod report;
mod scheduler;
mod status;

pub use engine::SyncEngine;
pub use natural_key::{
    CategoryNameKey, ExpenseKey, IncomeKey, KeyStrategies, Keyed, NaturalKey, NoFallback,
};
pub use reconcile::Reconciled;
pub use report::{PullReport, PushOutcome, PushReport, RecordPush, SyncOutcome, SyncReport};
pub use scheduler::spawn_periodic_sync;
pub use status::{StatusChannel, Subscription, SyncStatus, SyncTransition};
