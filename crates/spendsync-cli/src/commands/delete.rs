use std::path::Path;

use spendsync_core::EntityKind;

use crate::commands::common::{normalize_record_identifier, open_store, resolve_record_id};
use crate::error::CliError;

pub async fn run_delete(kind: EntityKind, id: &str, db_path: &Path) -> Result<(), CliError> {
    let normalized_id = normalize_record_identifier(id)?;
    let store = open_store(db_path)?;
    let record_id = resolve_record_id(kind, &normalized_id, &store).await?;

    store.delete(kind, &record_id).await?;
    println!("{record_id}");
    Ok(())
}
