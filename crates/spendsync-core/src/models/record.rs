//! Shared record identity and sync metadata

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::remote::{RecordPayload, RemoteRecord};
use crate::util::now_millis;

/// Local-store identity of a record, using UUID v7 (time-sortable).
///
/// Stable for the record's local lifetime and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalId(Uuid);

impl LocalId {
    /// Create a new unique local ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Entity types exchanged with the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Category,
    Expense,
    Income,
}

impl EntityKind {
    /// Fixed order of the push phase. Categories go first because expenses
    /// reference them by name.
    pub const PUSH_ORDER: [Self; 3] = [Self::Category, Self::Expense, Self::Income];

    /// Local table holding records of this kind.
    pub const fn table(self) -> &'static str {
        match self {
            Self::Category => "categories",
            Self::Expense => "expenses",
            Self::Income => "incomes",
        }
    }

    /// Remote collection path (`POST /<endpoint>`).
    pub const fn endpoint(self) -> &'static str {
        self.table()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "category" | "categories" => Ok(Self::Category),
            "expense" | "expenses" => Ok(Self::Expense),
            "income" | "incomes" => Ok(Self::Income),
            other => Err(Error::InvalidInput(format!("unknown entity kind '{other}'"))),
        }
    }
}

/// Sync bookkeeping carried by every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMeta {
    /// Identifier assigned by the remote store, once accepted there
    pub remote_id: Option<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last mutation timestamp (Unix ms), set by whichever side mutated last
    pub updated_at: i64,
    /// True only when the local copy is known to match the remote store
    pub synced: bool,
    /// Soft delete flag for sync
    pub is_deleted: bool,
}

impl SyncMeta {
    /// Metadata for a record created on this device.
    pub fn local() -> Self {
        let now = now_millis();
        Self {
            remote_id: None,
            created_at: now,
            updated_at: now,
            synced: false,
            is_deleted: false,
        }
    }

    /// Metadata for a record materialized from the remote store.
    pub fn from_remote(remote: &impl RemoteRecord) -> Self {
        let created_at = remote.created_at().or(remote.updated_at()).unwrap_or_else(now_millis);
        Self {
            remote_id: Some(remote.remote_id().to_string()),
            created_at,
            updated_at: remote.changed_at().unwrap_or(created_at),
            synced: true,
            is_deleted: remote.is_deleted(),
        }
    }

    /// A tombstone that never reached the remote store needs no remote call.
    pub const fn is_unpushed_tombstone(&self) -> bool {
        self.is_deleted && self.remote_id.is_none()
    }
}

/// A record type that participates in sync.
pub trait Record: Sized + Send + Sync + 'static {
    /// Wire representation pulled from the remote store.
    type Remote: RemoteRecord;

    const KIND: EntityKind;

    /// Append-only records are created when absent and never updated from
    /// the remote side afterwards.
    const APPEND_ONLY: bool = false;

    fn id(&self) -> &LocalId;

    fn meta(&self) -> &SyncMeta;

    /// Map a pulled remote record to a fresh local record.
    fn from_remote(remote: &Self::Remote) -> Result<Self>;

    /// Body of the create/upsert call for this record.
    fn to_payload(&self) -> RecordPayload;
}

/// One component of a natural key.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    /// Exact text match
    Text(String),
    /// Case-insensitive text match
    TextNoCase(String),
    /// Amount compared at cent precision
    Amount(f64),
}

/// Field/value pairs identifying "the same" record when no shared
/// identifier exists yet. An empty key never matches anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordKey {
    parts: Vec<(&'static str, KeyValue)>,
}

impl RecordKey {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, field: &'static str, value: impl Into<String>) -> Self {
        self.parts.push((field, KeyValue::Text(value.into())));
        self
    }

    #[must_use]
    pub fn text_nocase(mut self, field: &'static str, value: impl Into<String>) -> Self {
        self.parts.push((field, KeyValue::TextNoCase(value.into())));
        self
    }

    #[must_use]
    pub fn amount(mut self, field: &'static str, value: f64) -> Self {
        self.parts.push((field, KeyValue::Amount(value)));
        self
    }

    pub fn parts(&self) -> &[(&'static str, KeyValue)] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_id_unique() {
        let id1 = LocalId::new();
        let id2 = LocalId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_local_id_parse() {
        let id = LocalId::new();
        let parsed: LocalId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn entity_kind_parses_singular_and_plural() {
        assert_eq!("expenses".parse::<EntityKind>().unwrap(), EntityKind::Expense);
        assert_eq!("Income".parse::<EntityKind>().unwrap(), EntityKind::Income);
        assert!("budget".parse::<EntityKind>().is_err());
    }

    #[test]
    fn local_meta_starts_dirty() {
        let meta = SyncMeta::local();
        assert!(!meta.synced);
        assert!(meta.remote_id.is_none());
        assert_eq!(meta.created_at, meta.updated_at);
    }

    #[test]
    fn unpushed_tombstone_detection() {
        let mut meta = SyncMeta::local();
        assert!(!meta.is_unpushed_tombstone());
        meta.is_deleted = true;
        assert!(meta.is_unpushed_tombstone());
        meta.remote_id = Some("r1".to_string());
        assert!(!meta.is_unpushed_tombstone());
    }
}
