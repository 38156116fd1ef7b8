//! Shared repository plumbing: errors, generic table access, row helpers.
//!
//! # Responsibility
//! - Define `RepoError`/`RepoResult` used by every entity repository.
//! - Provide composition-style generic queries (`TableMapping`) for the
//!   common id/list/delete/restore shapes.
//! - Own id generation, timestamping and schema-readiness validation.
//!
//! # Invariants
//! - Every persisted timestamp comes from `now_utc()` (ISO-8601 UTC with
//!   millisecond precision and `Z` suffix).
//! - `TableMapping` queries only see rows with `deleted_at IS NULL`.
//! - A soft delete and a restore both bump `updated_at`.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use chrono::{SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type used by repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Row removal strategy for delete operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Stamp `deleted_at`; the row stays recoverable via `restore`.
    Soft,
    /// Remove the row; foreign-key cascades remove children.
    Hard,
}

/// Ordering for generic list reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListOrder {
    /// Oldest first.
    #[default]
    CreatedAsc,
    /// Newest first.
    CreatedDesc,
    /// Most recently touched first.
    UpdatedDesc,
    /// Alphabetical by name.
    NameAsc,
}

impl ListOrder {
    /// ORDER BY fragment with a deterministic id tie-break.
    fn order_by_clause(self) -> &'static str {
        match self {
            Self::CreatedAsc => "created_at ASC, id ASC",
            Self::CreatedDesc => "created_at DESC, id ASC",
            Self::UpdatedDesc => "updated_at DESC, id ASC",
            Self::NameAsc => "name ASC, id ASC",
        }
    }
}

/// Pagination/ordering options for generic list reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Result ordering.
    pub order: ListOrder,
    /// Maximum rows to return. `None` returns everything.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

/// Table-to-struct mapping shared by the generic queries.
///
/// Entity repositories declare one `const` mapping each and delegate the
/// common query shapes here instead of inheriting from a base type.
pub struct TableMapping<T> {
    /// Table name, always a compile-time constant.
    pub table: &'static str,
    /// Comma-separated column list matching `parse_row`.
    pub select_columns: &'static str,
    /// Converts one row into the read model.
    pub parse_row: fn(&Row<'_>) -> RepoResult<T>,
}

impl<T> TableMapping<T> {
    /// Loads one live row by id.
    pub fn find_by_id(&self, conn: &Connection, id: Uuid) -> RepoResult<Option<T>> {
        let sql = format!(
            "SELECT {columns}
             FROM {table}
             WHERE id = ?1
               AND deleted_at IS NULL;",
            columns = self.select_columns,
            table = self.table,
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some((self.parse_row)(row)?));
        }
        Ok(None)
    }

    /// Lists live rows using ordering + pagination options.
    pub fn find_all(&self, conn: &Connection, options: &FindOptions) -> RepoResult<Vec<T>> {
        let mut sql = format!(
            "SELECT {columns}
             FROM {table}
             WHERE deleted_at IS NULL
             ORDER BY {order}",
            columns = self.select_columns,
            table = self.table,
            order = options.order.order_by_clause(),
        );
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(limit) = options.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if options.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(options.offset)));
            }
        } else if options.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(options.offset)));
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push((self.parse_row)(row)?);
        }
        Ok(items)
    }

    /// Deletes one row. Soft mode only matches live rows.
    pub fn delete(&self, conn: &Connection, id: Uuid, mode: DeleteMode) -> RepoResult<bool> {
        let changed = match mode {
            DeleteMode::Soft => {
                let sql = format!(
                    "UPDATE {table}
                     SET deleted_at = ?2,
                         updated_at = ?2
                     WHERE id = ?1
                       AND deleted_at IS NULL;",
                    table = self.table,
                );
                conn.execute(&sql, params![id.to_string(), now_utc()])?
            }
            DeleteMode::Hard => {
                let sql = format!(
                    "DELETE FROM {table} WHERE id = ?1;",
                    table = self.table,
                );
                conn.execute(&sql, [id.to_string()])?
            }
        };
        Ok(changed > 0)
    }

    /// Clears the soft-delete marker on one row.
    pub fn restore(&self, conn: &Connection, id: Uuid) -> RepoResult<bool> {
        let sql = format!(
            "UPDATE {table}
             SET deleted_at = NULL,
                 updated_at = ?2
             WHERE id = ?1
               AND deleted_at IS NOT NULL;",
            table = self.table,
        );
        let changed = conn.execute(&sql, params![id.to_string(), now_utc()])?;
        Ok(changed > 0)
    }
}

/// Generates a fresh entity id.
pub fn new_entity_id() -> Uuid {
    Uuid::new_v4()
}

/// Current UTC timestamp in the persisted wire format.
pub fn now_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses one persisted uuid column, rejecting corrupt values.
pub fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

/// Converts one persisted 0/1 flag column, rejecting other values.
pub fn int_to_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

/// Converts a flag for persistence.
pub fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

/// Verifies the ledger sits exactly at the latest known migration version.
pub(crate) fn ensure_schema_current(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    if !table_exists(conn, "migrations")? {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        });
    }

    let actual_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations;",
        [],
        |row| row.get(0),
    )?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    Ok(())
}

/// Verifies one table and its required columns exist.
pub(crate) fn ensure_table(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    if !table_exists(conn, table)? {
        return Err(RepoError::MissingRequiredTable(table));
    }

    for column in columns {
        if !table_has_column(conn, table, column)? {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
