//! Category model

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::remote::{CategoryPayload, RecordPayload, RemoteCategory};

use super::record::{EntityKind, LocalId, Record, SyncMeta};

/// A spending category. Categories are immutable once named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: LocalId,
    pub name: String,
    pub meta: SyncMeta,
}

impl Category {
    /// Create a new, not yet synced category.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidInput(
                "Category name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            id: LocalId::new(),
            name,
            meta: SyncMeta::local(),
        })
    }
}

impl Record for Category {
    type Remote = RemoteCategory;

    const KIND: EntityKind = EntityKind::Category;
    const APPEND_ONLY: bool = true;

    fn id(&self) -> &LocalId {
        &self.id
    }

    fn meta(&self) -> &SyncMeta {
        &self.meta
    }

    fn from_remote(remote: &RemoteCategory) -> Result<Self> {
        let name = remote.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput(format!(
                "remote category {} has an empty name",
                remote.id
            )));
        }
        Ok(Self {
            id: LocalId::new(),
            name: name.to_string(),
            meta: SyncMeta::from_remote(remote),
        })
    }

    fn to_payload(&self) -> RecordPayload {
        RecordPayload::Category(CategoryPayload {
            id: self.meta.remote_id.clone(),
            name: self.name.clone(),
            created_at: self.meta.created_at,
            updated_at: self.meta.updated_at,
            is_deleted: self.meta.is_deleted,
        })
    }
}
