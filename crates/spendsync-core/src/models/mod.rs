//! Data models for spendsync

mod category;
mod expense;
mod income;
mod record;

pub use category::Category;
pub use expense::Expense;
pub use income::IncomeEntry;
pub use record::{EntityKind, KeyValue, LocalId, Record, RecordKey, SyncMeta};
