use std::path::Path;

use serde::Serialize;
use spendsync_core::{Category, EntityKind, Expense, IncomeEntry};

use crate::commands::common::{
    format_category_lines, format_expense_lines, format_income_lines, open_store,
};
use crate::error::CliError;

pub async fn run_list(
    kind: EntityKind,
    include_deleted: bool,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path)?;

    let lines = match kind {
        EntityKind::Expense => render(
            &store.list::<Expense>(include_deleted).await?,
            as_json,
            format_expense_lines,
        )?,
        EntityKind::Income => render(
            &store.list::<IncomeEntry>(include_deleted).await?,
            as_json,
            format_income_lines,
        )?,
        EntityKind::Category => render(
            &store.list::<Category>(include_deleted).await?,
            as_json,
            format_category_lines,
        )?,
    };

    if lines.is_empty() {
        println!("No {kind} records.");
    }
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn render<T: Serialize>(
    records: &[T],
    as_json: bool,
    format_lines: fn(&[T]) -> Vec<String>,
) -> Result<Vec<String>, CliError> {
    if as_json {
        Ok(vec![serde_json::to_string_pretty(records)?])
    } else {
        Ok(format_lines(records))
    }
}
