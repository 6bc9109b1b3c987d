//! spendsync-core - Offline-first sync engine for a personal finance tracker
//!
//! Expenses, incomes and categories live in a local `SQLite` store and are
//! kept in step with a remote HTTP store. Local edits are pushed first, then
//! remote changes since the last pull cursor are reconciled into the local
//! store.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod sync;
pub mod util;

pub use config::{ConfigError, SyncConfig};
pub use error::{Error, Result};
pub use models::{Category, EntityKind, Expense, IncomeEntry, LocalId, Record, SyncMeta};
pub use remote::{HttpRemoteStore, RemoteError, RemoteStore};
pub use services::LocalStore;
pub use sync::{spawn_periodic_sync, SyncEngine, SyncOutcome, SyncReport, SyncStatus};
