//! Natural keys used to pair pulled records with local records that were
//! created offline and have no remote id yet.

use std::fmt;
use std::sync::Arc;

use crate::models::{Category, Expense, IncomeEntry, RecordKey};

/// Derives the natural key of a record.
pub trait NaturalKey<T>: Send + Sync {
    fn natural_key(&self, record: &T) -> RecordKey;
}

impl<T, F> NaturalKey<T> for F
where
    F: Fn(&T) -> RecordKey + Send + Sync,
{
    fn natural_key(&self, record: &T) -> RecordKey {
        self(record)
    }
}

/// Expenses match on item name, date and amount.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpenseKey;

impl NaturalKey<Expense> for ExpenseKey {
    fn natural_key(&self, record: &Expense) -> RecordKey {
        RecordKey::new()
            .text("item_name", &record.item_name)
            .text("date", &record.date)
            .amount("amount", record.amount)
    }
}

/// Incomes match on source, date and amount.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncomeKey;

impl NaturalKey<IncomeEntry> for IncomeKey {
    fn natural_key(&self, record: &IncomeEntry) -> RecordKey {
        RecordKey::new()
            .text("source", &record.source)
            .text("date", &record.date)
            .amount("amount", record.amount)
    }
}

/// Categories match on name, ignoring case.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryNameKey;

impl NaturalKey<Category> for CategoryNameKey {
    fn natural_key(&self, record: &Category) -> RecordKey {
        RecordKey::new().text_nocase("name", &record.name)
    }
}

/// Disables fallback matching: only remote ids pair records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFallback;

impl<T> NaturalKey<T> for NoFallback {
    fn natural_key(&self, _record: &T) -> RecordKey {
        RecordKey::new()
    }
}

/// The natural key strategy for each entity type.
#[derive(Clone)]
pub struct KeyStrategies {
    pub categories: Arc<dyn NaturalKey<Category>>,
    pub expenses: Arc<dyn NaturalKey<Expense>>,
    pub incomes: Arc<dyn NaturalKey<IncomeEntry>>,
}

impl Default for KeyStrategies {
    fn default() -> Self {
        Self {
            categories: Arc::new(CategoryNameKey),
            expenses: Arc::new(ExpenseKey),
            incomes: Arc::new(IncomeKey),
        }
    }
}

impl fmt::Debug for KeyStrategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStrategies").finish_non_exhaustive()
    }
}

impl KeyStrategies {
    #[must_use]
    pub fn with_categories(mut self, strategy: impl NaturalKey<Category> + 'static) -> Self {
        self.categories = Arc::new(strategy);
        self
    }

    #[must_use]
    pub fn with_expenses(mut self, strategy: impl NaturalKey<Expense> + 'static) -> Self {
        self.expenses = Arc::new(strategy);
        self
    }

    #[must_use]
    pub fn with_incomes(mut self, strategy: impl NaturalKey<IncomeEntry> + 'static) -> Self {
        self.incomes = Arc::new(strategy);
        self
    }
}

/// Picks the strategy for `Self` out of a [`KeyStrategies`].
pub trait Keyed: Sized {
    fn strategy(keys: &KeyStrategies) -> &dyn NaturalKey<Self>;
}

impl Keyed for Category {
    fn strategy(keys: &KeyStrategies) -> &dyn NaturalKey<Self> {
        keys.categories.as_ref()
    }
}

impl Keyed for Expense {
    fn strategy(keys: &KeyStrategies) -> &dyn NaturalKey<Self> {
        keys.expenses.as_ref()
    }
}

impl Keyed for IncomeEntry {
    fn strategy(keys: &KeyStrategies) -> &dyn NaturalKey<Self> {
        keys.incomes.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KeyValue;

    #[test]
    fn expense_key_uses_name_date_and_amount() {
        let expense = Expense::new("Coffee", 4.5, "2024-05-01").unwrap();
        let key = ExpenseKey.natural_key(&expense);
        assert_eq!(
            key.parts(),
            &[
                ("item_name", KeyValue::Text("Coffee".to_string())),
                ("date", KeyValue::Text("2024-05-01".to_string())),
                ("amount", KeyValue::Amount(4.5)),
            ]
        );
    }

    #[test]
    fn closures_are_strategies() {
        let keys = KeyStrategies::default().with_expenses(|expense: &Expense| {
            RecordKey::new().text("item_name", &expense.item_name)
        });
        let expense = Expense::new("Coffee", 4.5, "2024-05-01").unwrap();
        assert_eq!(Expense::strategy(&keys).natural_key(&expense).parts().len(), 1);
    }

    #[test]
    fn no_fallback_yields_empty_key() {
        let category = Category::new("Food").unwrap();
        assert!(NoFallback.natural_key(&category).is_empty());
    }
}
