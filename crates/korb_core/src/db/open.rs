//! SQLite connection setup.
//!
//! # Responsibility
//! - Open the shopping database from a file path or in memory.
//! - Apply connection pragmas and pending migrations before handing the
//!   connection out.
//!
//! # Invariants
//! - `foreign_keys` is ON for every returned connection.
//! - Every returned connection is at the latest schema version.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (or creates) the shopping database at `path`.
///
/// Pragmas and migrations run before the connection is returned, so callers
/// always see the current schema.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    prepare(Connection::open(path), "file")
}

/// Opens a fresh in-memory database with the full schema applied.
///
/// Every call returns an independent database; state is gone once the
/// connection drops.
pub fn open_db_in_memory() -> DbResult<Connection> {
    prepare(Connection::open_in_memory(), "memory")
}

fn prepare(opened: rusqlite::Result<Connection>, mode: &'static str) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    match configure(opened) {
        Ok(conn) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
    }
}

fn configure(opened: rusqlite::Result<Connection>) -> DbResult<Connection> {
    let mut conn = opened?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}
