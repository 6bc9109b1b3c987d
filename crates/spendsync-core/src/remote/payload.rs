//! Wire formats exchanged with the remote store.
//!
//! Required fields have no serde default, so a record missing one fails the
//! whole pull instead of being stored half-filled.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::EntityKind;

/// Common accessors over pulled remote records.
pub trait RemoteRecord: Send + Sync {
    fn remote_id(&self) -> &str;
    fn created_at(&self) -> Option<i64>;
    fn updated_at(&self) -> Option<i64>;
    fn is_deleted(&self) -> bool;

    /// Timestamp used for cursor advancement: update time, else creation time.
    fn changed_at(&self) -> Option<i64> {
        self.updated_at().or_else(|| self.created_at())
    }
}

/// Identifier keys a record may carry. Mongo-style servers send `_id` and,
/// with virtuals enabled, an `id` copy as well; `_id` wins.
#[derive(Deserialize)]
struct WireId {
    #[serde(default, rename = "_id")]
    mongo_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

fn wire_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let WireId { mongo_id, id } = WireId::deserialize(deserializer)?;
    Ok(mongo_id.or(id))
}

fn required_wire_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    wire_id(deserializer)?.ok_or_else(|| D::Error::missing_field("_id"))
}

macro_rules! impl_remote_record {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl RemoteRecord for $ty {
                fn remote_id(&self) -> &str {
                    &self.id
                }

                fn created_at(&self) -> Option<i64> {
                    self.created_at
                }

                fn updated_at(&self) -> Option<i64> {
                    self.updated_at
                }

                fn is_deleted(&self) -> bool {
                    self.is_deleted
                }
            }
        )+
    };
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteExpense {
    #[serde(flatten, deserialize_with = "required_wire_id")]
    pub id: String,
    pub item_name: String,
    pub amount: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub month: Option<String>,
    pub date: String,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteIncome {
    #[serde(flatten, deserialize_with = "required_wire_id")]
    pub id: String,
    pub source: String,
    pub amount: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub month: Option<String>,
    pub date: String,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCategory {
    #[serde(flatten, deserialize_with = "required_wire_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl_remote_record!(RemoteExpense, RemoteIncome, RemoteCategory);

/// Response of `GET /sync?since=<ms>`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    #[serde(default)]
    pub categories: Vec<RemoteCategory>,
    #[serde(default)]
    pub expenses: Vec<RemoteExpense>,
    #[serde(default)]
    pub incomes: Vec<RemoteIncome>,
    /// Server clock at response time. Informational only.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl ChangeSet {
    pub fn len(&self) -> usize {
        self.categories.len() + self.expenses.len() + self.incomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Largest change timestamp across every received record.
    pub fn max_changed_at(&self) -> Option<i64> {
        let categories = self.categories.iter().filter_map(RemoteRecord::changed_at);
        let expenses = self.expenses.iter().filter_map(RemoteRecord::changed_at);
        let incomes = self.incomes.iter().filter_map(RemoteRecord::changed_at);
        categories.chain(expenses).chain(incomes).max()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub item_name: String,
    pub amount: f64,
    pub category: Option<String>,
    pub notes: Option<String>,
    pub month: String,
    pub date: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub amount: f64,
    pub notes: Option<String>,
    pub month: String,
    pub date: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_deleted: bool,
}

/// Body of a `POST /<entity>` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordPayload {
    Category(CategoryPayload),
    Expense(ExpensePayload),
    Income(IncomePayload),
}

impl RecordPayload {
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Category(_) => EntityKind::Category,
            Self::Expense(_) => EntityKind::Expense,
            Self::Income(_) => EntityKind::Income,
        }
    }
}

/// Response of a `POST /<entity>` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreatedRecord {
    #[serde(flatten, deserialize_with = "wire_id")]
    pub id: Option<String>,
}
