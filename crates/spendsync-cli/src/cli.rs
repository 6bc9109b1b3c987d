use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use spendsync_core::EntityKind;

#[derive(Parser)]
#[command(name = "spendsync")]
#[command(about = "Track expenses offline and sync them with your remote ledger")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record expenses
    Expense {
        #[command(subcommand)]
        command: ExpenseCommands,
    },
    /// Record incomes
    Income {
        #[command(subcommand)]
        command: IncomeCommands,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// List records of one kind
    List {
        #[arg(value_enum)]
        kind: KindArg,
        /// Include deleted records
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a record (synced as a tombstone)
    Delete {
        #[arg(value_enum)]
        kind: KindArg,
        /// Record ID or unique ID prefix
        id: String,
    },
    /// Push local changes and pull remote changes
    Sync {
        /// Pull everything instead of changes since the last sync
        #[arg(long)]
        force: bool,
        /// Keep syncing on the configured interval until interrupted
        #[arg(long)]
        watch: bool,
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show pending changes and push failures
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Add an expense
    Add(ExpenseArgs),
}

#[derive(Args)]
pub struct ExpenseArgs {
    /// What the money was spent on
    pub item_name: String,
    pub amount: f64,
    /// Event date (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand)]
pub enum IncomeCommands {
    /// Add an income entry
    Add(IncomeArgs),
}

#[derive(Args)]
pub struct IncomeArgs {
    /// Where the money came from
    pub source: String,
    pub amount: f64,
    /// Event date (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Add a category
    Add {
        name: String,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum KindArg {
    #[value(alias = "expenses")]
    Expense,
    #[value(alias = "incomes")]
    Income,
    #[value(alias = "categories")]
    Category,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Expense => Self::Expense,
            KindArg::Income => Self::Income,
            KindArg::Category => Self::Category,
        }
    }
}
