//! Database layer for spendsync

mod connection;
mod cursor_repository;
mod failure_repository;
mod migrations;
mod repository;

pub use connection::Database;
pub use cursor_repository::{CursorStore, SqliteCursorStore};
pub use failure_repository::{PushFailure, SqlitePushFailureRepository};
pub use repository::{count_unsynced, SqliteRecordRepository, TableRecord};
