//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `korb_core` linkage.
//! - Run an in-memory migrate/create/read pass for quick local sanity
//!   checks, independent from the Flutter/FFI runtime setup.

use korb_core::{
    latest_version, open_db_in_memory, ItemService, ListService, SqliteListItemRepository,
    SqliteListRepository,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("korb_core ping={}", korb_core::ping());
    println!("korb_core version={}", korb_core::core_version());

    match smoke_pass() {
        Ok(summary) => {
            println!("smoke={summary}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("smoke failed: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Opens a migrated in-memory database, creates a list through the
/// service layer, quick-adds two items and reads the counters back.
fn smoke_pass() -> Result<String, Box<dyn std::error::Error>> {
    let conn = open_db_in_memory()?;

    let list_service = ListService::new(
        SqliteListRepository::try_new(&conn)?,
        SqliteListItemRepository::try_new(&conn)?,
    );
    let list = list_service.create_list("Wocheneinkauf", None)?;

    let item_service = ItemService::new(SqliteListItemRepository::try_new(&conn)?);
    let added = item_service.parse_and_add_items(list.id, "2 kg Kartoffeln\nMilch");

    let fresh = list_service
        .get_list(list.id)?
        .ok_or("created list missing")?;

    Ok(format!(
        "schema_version={} list={} added={} total={}",
        latest_version(),
        fresh.name,
        added.len(),
        fresh.total_items
    ))
}
