//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply each pending migration atomically, exactly once.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - The `migrations` ledger table is append-only and is the single source
//!   of truth for which versions have been applied.
//! - A migration script and its ledger row commit together or not at all.

use crate::db::{DbError, DbResult};
use chrono::{SecondsFormat, Utc};
use log::info;
use rusqlite::{params, Connection};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "core_tables",
        sql: include_str!("0001_core_tables.sql"),
    },
    Migration {
        version: 2,
        name: "lookup_indexes",
        sql: include_str!("0002_lookup_indexes.sql"),
    },
];

const CREATE_LEDGER_SQL: &str = "CREATE TABLE IF NOT EXISTS migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);";

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
///
/// Returns the versions applied by this call, oldest first; an empty vec
/// means the schema was already current.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<Vec<u32>> {
    conn.execute_batch(CREATE_LEDGER_SQL)?;

    let current_version = ledger_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    let mut applied = Vec::new();
    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)
            .map_err(|err| DbError::Migration {
                version: migration.version,
                name: migration.name,
                source: err,
            })?;
        tx.execute(
            "INSERT INTO migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![
                migration.version,
                migration.name,
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
            ],
        )
        .map_err(|err| DbError::Migration {
            version: migration.version,
            name: migration.name,
            source: err,
        })?;
        tx.commit()?;

        info!(
            "event=migration_applied module=db version={} name={}",
            migration.version, migration.name
        );
        applied.push(migration.version);
    }

    Ok(applied)
}

/// Reads the highest applied version from the ledger, 0 when empty.
fn ledger_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("SELECT MAX(version) FROM migrations", [], |row| {
        row.get::<_, Option<u32>>(0)
    })?;
    Ok(version.unwrap_or(0))
}
