//! spendsync CLI - record expenses offline and sync them from the terminal

mod cli;
mod commands;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{CategoryCommands, Cli, Commands, ExpenseCommands, IncomeCommands};
use crate::commands::add::{run_add_category, run_add_expense, run_add_income};
use crate::commands::common::resolve_db_path;
use crate::commands::delete::run_delete;
use crate::commands::list::run_list;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spendsync=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path)?;

    match cli.command {
        Commands::Expense {
            command: ExpenseCommands::Add(args),
        } => run_add_expense(&args, &db_path).await?,
        Commands::Income {
            command: IncomeCommands::Add(args),
        } => run_add_income(&args, &db_path).await?,
        Commands::Category {
            command: CategoryCommands::Add { name },
        } => run_add_category(&name, &db_path).await?,
        Commands::List { kind, all, json } => run_list(kind.into(), all, json, &db_path).await?,
        Commands::Delete { kind, id } => run_delete(kind.into(), &id, &db_path).await?,
        Commands::Sync { force, watch, json } => run_sync(force, watch, json, &db_path).await?,
        Commands::Status { json } => run_status(json, &db_path).await?,
    }

    Ok(())
}
