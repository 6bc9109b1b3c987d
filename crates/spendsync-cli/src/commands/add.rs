use std::path::Path;

use spendsync_core::{Category, Expense, IncomeEntry};

use crate::cli::{ExpenseArgs, IncomeArgs};
use crate::commands::common::{open_store, today};
use crate::error::CliError;

pub async fn run_add_expense(args: &ExpenseArgs, db_path: &Path) -> Result<(), CliError> {
    let date = args.date.clone().unwrap_or_else(today);
    let mut expense = Expense::new(&args.item_name, args.amount, &date)?;
    if let Some(category) = &args.category {
        expense = expense.with_category(category);
    }
    if let Some(notes) = &args.notes {
        expense = expense.with_notes(notes);
    }

    let store = open_store(db_path)?;
    store.insert(&expense).await?;
    println!("{}", expense.id);
    Ok(())
}

pub async fn run_add_income(args: &IncomeArgs, db_path: &Path) -> Result<(), CliError> {
    let date = args.date.clone().unwrap_or_else(today);
    let mut income = IncomeEntry::new(&args.source, args.amount, &date)?;
    if let Some(notes) = &args.notes {
        income = income.with_notes(notes);
    }

    let store = open_store(db_path)?;
    store.insert(&income).await?;
    println!("{}", income.id);
    Ok(())
}

pub async fn run_add_category(name: &str, db_path: &Path) -> Result<(), CliError> {
    let category = Category::new(name)?;

    let store = open_store(db_path)?;
    store.insert(&category).await?;
    println!("{}", category.id);
    Ok(())
}
