//! Expense model

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::remote::{ExpensePayload, RecordPayload, RemoteExpense};
use crate::util::{month_of, normalize_date, normalize_text_option};

use super::record::{EntityKind, LocalId, Record, SyncMeta};

/// A single spending entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Local identifier
    pub id: LocalId,
    /// What the money was spent on
    pub item_name: String,
    /// Amount in currency units
    pub amount: f64,
    /// Category name, if any
    pub category: Option<String>,
    /// Free-text notes
    pub notes: Option<String>,
    /// Month bucket (`YYYY-MM`)
    pub month: String,
    /// Event date (`YYYY-MM-DD`)
    pub date: String,
    /// Sync bookkeeping
    pub meta: SyncMeta,
}

impl Expense {
    /// Create a new, not yet synced expense.
    pub fn new(item_name: impl Into<String>, amount: f64, date: &str) -> Result<Self> {
        let item_name = item_name.into().trim().to_string();
        if item_name.is_empty() {
            return Err(Error::InvalidInput(
                "Expense item name cannot be empty".to_string(),
            ));
        }
        validate_amount(amount)?;
        let date = normalize_date(date)?;

        Ok(Self {
            id: LocalId::new(),
            item_name,
            amount,
            category: None,
            notes: None,
            month: month_of(&date),
            date,
            meta: SyncMeta::local(),
        })
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = normalize_text_option(Some(category.into()));
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = normalize_text_option(Some(notes.into()));
        self
    }
}

impl Record for Expense {
    type Remote = RemoteExpense;

    const KIND: EntityKind = EntityKind::Expense;

    fn id(&self) -> &LocalId {
        &self.id
    }

    fn meta(&self) -> &SyncMeta {
        &self.meta
    }

    fn from_remote(remote: &RemoteExpense) -> Result<Self> {
        let date = normalize_date(&remote.date)?;
        let month = normalize_text_option(remote.month.clone()).unwrap_or_else(|| month_of(&date));

        Ok(Self {
            id: LocalId::new(),
            item_name: remote.item_name.trim().to_string(),
            amount: remote.amount,
            category: normalize_text_option(remote.category.clone()),
            notes: normalize_text_option(remote.notes.clone()),
            month,
            date,
            meta: SyncMeta::from_remote(remote),
        })
    }

    fn to_payload(&self) -> RecordPayload {
        RecordPayload::Expense(ExpensePayload {
            id: self.meta.remote_id.clone(),
            item_name: self.item_name.clone(),
            amount: self.amount,
            category: self.category.clone(),
            notes: self.notes.clone(),
            month: self.month.clone(),
            date: self.date.clone(),
            created_at: self.meta.created_at,
            updated_at: self.meta.updated_at,
            is_deleted: self.meta.is_deleted,
        })
    }
}

pub(crate) fn validate_amount(amount: f64) -> Result<()> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Amount must be a non-negative number, got {amount}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(id: &str) -> RemoteExpense {
        RemoteExpense {
            id: id.to_string(),
            item_name: " Coffee ".to_string(),
            amount: 120.0,
            category: Some("Food".to_string()),
            notes: Some("  ".to_string()),
            month: None,
            date: "2024-05-01T08:00:00.000Z".to_string(),
            created_at: Some(1_000),
            updated_at: Some(2_000),
            is_deleted: false,
        }
    }

    #[test]
    fn test_expense_new() {
        let expense = Expense::new("Coffee", 120.0, "2024-05-01").unwrap();
        assert_eq!(expense.item_name, "Coffee");
        assert_eq!(expense.month, "2024-05");
        assert!(!expense.meta.synced);
        assert!(expense.meta.remote_id.is_none());
    }

    #[test]
    fn test_expense_validation() {
        assert!(Expense::new("  ", 1.0, "2024-05-01").is_err());
        assert!(Expense::new("Coffee", -1.0, "2024-05-01").is_err());
        assert!(Expense::new("Coffee", f64::NAN, "2024-05-01").is_err());
        assert!(Expense::new("Coffee", 1.0, "yesterday").is_err());
    }

    #[test]
    fn from_remote_copies_fields_and_marks_synced() {
        let expense = Expense::from_remote(&remote("r-1")).unwrap();
        assert_eq!(expense.item_name, "Coffee");
        assert_eq!(expense.date, "2024-05-01");
        assert_eq!(expense.month, "2024-05");
        assert_eq!(expense.notes, None);
        assert_eq!(expense.meta.remote_id.as_deref(), Some("r-1"));
        assert_eq!(expense.meta.updated_at, 2_000);
        assert!(expense.meta.synced);
    }

    #[test]
    fn from_remote_falls_back_to_created_at() {
        let mut wire = remote("r-2");
        wire.updated_at = None;
        let expense = Expense::from_remote(&wire).unwrap();
        assert_eq!(expense.meta.updated_at, 1_000);
    }

    #[test]
    fn payload_carries_existing_remote_id() {
        let mut expense = Expense::new("Coffee", 120.0, "2024-05-01")
            .unwrap()
            .with_category("Food");
        expense.meta.remote_id = Some("r-9".to_string());

        let RecordPayload::Expense(payload) = expense.to_payload() else {
            panic!("expected expense payload");
        };
        assert_eq!(payload.id.as_deref(), Some("r-9"));
        assert_eq!(payload.category.as_deref(), Some("Food"));
    }
}
