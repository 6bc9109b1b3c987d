//! Income entry model

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::remote::{IncomePayload, RecordPayload, RemoteIncome};
use crate::util::{month_of, normalize_date, normalize_text_option};

use super::expense::validate_amount;
use super::record::{EntityKind, LocalId, Record, SyncMeta};

/// A single income entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeEntry {
    pub id: LocalId,
    /// Where the money came from
    pub source: String,
    pub amount: f64,
    pub notes: Option<String>,
    /// Month bucket (`YYYY-MM`)
    pub month: String,
    /// Event date (`YYYY-MM-DD`)
    pub date: String,
    pub meta: SyncMeta,
}

impl IncomeEntry {
    /// Create a new, not yet synced income entry.
    pub fn new(source: impl Into<String>, amount: f64, date: &str) -> Result<Self> {
        let source = source.into().trim().to_string();
        if source.is_empty() {
            return Err(Error::InvalidInput(
                "Income source cannot be empty".to_string(),
            ));
        }
        validate_amount(amount)?;
        let date = normalize_date(date)?;

        Ok(Self {
            id: LocalId::new(),
            source,
            amount,
            notes: None,
            month: month_of(&date),
            date,
            meta: SyncMeta::local(),
        })
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = normalize_text_option(Some(notes.into()));
        self
    }
}

impl Record for IncomeEntry {
    type Remote = RemoteIncome;

    const KIND: EntityKind = EntityKind::Income;

    fn id(&self) -> &LocalId {
        &self.id
    }

    fn meta(&self) -> &SyncMeta {
        &self.meta
    }

    fn from_remote(remote: &RemoteIncome) -> Result<Self> {
        let date = normalize_date(&remote.date)?;
        let month = normalize_text_option(remote.month.clone()).unwrap_or_else(|| month_of(&date));

        Ok(Self {
            id: LocalId::new(),
            source: remote.source.trim().to_string(),
            amount: remote.amount,
            notes: normalize_text_option(remote.notes.clone()),
            month,
            date,
            meta: SyncMeta::from_remote(remote),
        })
    }

    fn to_payload(&self) -> RecordPayload {
        RecordPayload::Income(IncomePayload {
            id: self.meta.remote_id.clone(),
            source: self.source.clone(),
            amount: self.amount,
            notes: self.notes.clone(),
            month: self.month.clone(),
            date: self.date.clone(),
            created_at: self.meta.created_at,
            updated_at: self.meta.updated_at,
            is_deleted: self.meta.is_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_income_new() {
        let income = IncomeEntry::new("Salary", 3_000.0, "2024-05-31")
            .unwrap()
            .with_notes("May");
        assert_eq!(income.source, "Salary");
        assert_eq!(income.month, "2024-05");
        assert_eq!(income.notes.as_deref(), Some("May"));
    }

    #[test]
    fn from_remote_keeps_explicit_month() {
        let remote = RemoteIncome {
            id: "inc-1".to_string(),
            source: "Salary".to_string(),
            amount: 10.0,
            notes: None,
            month: Some("2024-04".to_string()),
            date: "2024-05-01".to_string(),
            created_at: None,
            updated_at: Some(7),
            is_deleted: true,
        };
        let income = IncomeEntry::from_remote(&remote).unwrap();
        assert_eq!(income.month, "2024-04");
        assert!(income.meta.is_deleted);
        assert_eq!(income.meta.created_at, 7);
    }
}
