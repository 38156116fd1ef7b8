//! Shopping list repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide persistence APIs for `lists` rows, counters included.
//! - Keep SQL details and ordering behavior inside the repository boundary.
//!
//! # Invariants
//! - Normal reads return the stored `total_items`/`completed_items`
//!   counters; the live-count reads exist only as audit paths.
//! - An empty patch never touches the row (and never bumps `updated_at`).
//! - Soft-deleting a list leaves its items untouched; cascades are a
//!   service-level concern.

use crate::model::list::{List, ListId};
use crate::repo::base::{
    ensure_schema_current, ensure_table, new_entity_id, now_utc, parse_uuid, DeleteMode,
    FindOptions, RepoResult, TableMapping,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const LIST_COLUMNS: &str =
    "id, name, description, created_at, updated_at, total_items, completed_items";

const LIST_MAPPING: TableMapping<List> = TableMapping {
    table: "lists",
    select_columns: LIST_COLUMNS,
    parse_row: parse_list_row,
};

/// Input for list creation. Validation happens in the service layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewList {
    pub name: String,
    pub description: Option<String>,
}

/// Typed partial update for one list row.
///
/// `None` leaves a column untouched; `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub total_items: Option<i64>,
    pub completed_items: Option<i64>,
}

impl ListPatch {
    /// True when the patch carries no column at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.total_items.is_none()
            && self.completed_items.is_none()
    }
}

/// Audit read pairing the stored counters with counts computed live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListWithLiveCounts {
    pub list: List,
    /// Live items counted by joining `list_items` at read time.
    pub live_total: i64,
    /// Live checked items counted at read time.
    pub live_completed: i64,
}

/// Repository interface for shopping list operations.
pub trait ListRepository {
    /// Creates one list with zeroed counters and returns it.
    fn create(&self, list: &NewList) -> RepoResult<List>;
    /// Loads one live list by id.
    fn get(&self, id: ListId) -> RepoResult<Option<List>>;
    /// Lists live lists using ordering + pagination options.
    fn get_all(&self, options: &FindOptions) -> RepoResult<Vec<List>>;
    /// Applies a partial update. Returns `false` for empty patches and
    /// missing rows.
    fn update(&self, id: ListId, patch: &ListPatch) -> RepoResult<bool>;
    /// Deletes one list in the requested mode.
    fn delete(&self, id: ListId, mode: DeleteMode) -> RepoResult<bool>;
    /// Clears the soft-delete marker on one list.
    fn restore(&self, id: ListId) -> RepoResult<bool>;
    /// Audit read: one list with counts recomputed from live items.
    fn get_with_live_counts(&self, id: ListId) -> RepoResult<Option<ListWithLiveCounts>>;
    /// Audit read over all live lists, most recently updated first.
    fn get_all_with_live_counts(&self) -> RepoResult<Vec<ListWithLiveCounts>>;
}

/// SQLite-backed shopping list repository.
#[derive(Debug)]
pub struct SqliteListRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteListRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_current(conn)?;
        ensure_table(
            conn,
            "lists",
            &[
                "id",
                "name",
                "description",
                "created_at",
                "updated_at",
                "deleted_at",
                "total_items",
                "completed_items",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl ListRepository for SqliteListRepository<'_> {
    fn create(&self, list: &NewList) -> RepoResult<List> {
        let now = now_utc();
        let created = List {
            id: new_entity_id(),
            name: list.name.clone(),
            description: list.description.clone(),
            created_at: now.clone(),
            updated_at: now,
            total_items: 0,
            completed_items: 0,
        };
        self.conn.execute(
            "INSERT INTO lists (
                id,
                name,
                description,
                created_at,
                updated_at,
                total_items,
                completed_items
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, 0);",
            params![
                created.id.to_string(),
                created.name,
                created.description,
                created.created_at,
                created.updated_at,
            ],
        )?;
        Ok(created)
    }

    fn get(&self, id: ListId) -> RepoResult<Option<List>> {
        LIST_MAPPING.find_by_id(self.conn, id)
    }

    fn get_all(&self, options: &FindOptions) -> RepoResult<Vec<List>> {
        LIST_MAPPING.find_all(self.conn, options)
    }

    fn update(&self, id: ListId, patch: &ListPatch) -> RepoResult<bool> {
        if patch.is_empty() {
            return Ok(false);
        }

        let mut assignments: Vec<&'static str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(name) = patch.name.as_ref() {
            assignments.push("name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        if let Some(description) = patch.description.as_ref() {
            assignments.push("description = ?");
            bind_values.push(match description {
                Some(value) => Value::Text(value.clone()),
                None => Value::Null,
            });
        }
        if let Some(total_items) = patch.total_items {
            assignments.push("total_items = ?");
            bind_values.push(Value::Integer(total_items));
        }
        if let Some(completed_items) = patch.completed_items {
            assignments.push("completed_items = ?");
            bind_values.push(Value::Integer(completed_items));
        }
        assignments.push("updated_at = ?");
        bind_values.push(Value::Text(now_utc()));

        let sql = format!(
            "UPDATE lists
             SET {assignments}
             WHERE id = ?
               AND deleted_at IS NULL;",
            assignments = assignments.join(", "),
        );
        bind_values.push(Value::Text(id.to_string()));
        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(changed > 0)
    }

    fn delete(&self, id: ListId, mode: DeleteMode) -> RepoResult<bool> {
        LIST_MAPPING.delete(self.conn, id, mode)
    }

    fn restore(&self, id: ListId) -> RepoResult<bool> {
        LIST_MAPPING.restore(self.conn, id)
    }

    fn get_with_live_counts(&self, id: ListId) -> RepoResult<Option<ListWithLiveCounts>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LIVE_COUNT_SELECT}
             WHERE l.id = ?1
               AND l.deleted_at IS NULL
             GROUP BY l.id;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_live_count_row(row)?));
        }
        Ok(None)
    }

    fn get_all_with_live_counts(&self) -> RepoResult<Vec<ListWithLiveCounts>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LIVE_COUNT_SELECT}
             WHERE l.deleted_at IS NULL
             GROUP BY l.id
             ORDER BY l.updated_at DESC, l.id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut lists = Vec::new();
        while let Some(row) = rows.next()? {
            lists.push(parse_live_count_row(row)?);
        }
        Ok(lists)
    }
}

const LIVE_COUNT_SELECT: &str = "SELECT
    l.id AS id,
    l.name AS name,
    l.description AS description,
    l.created_at AS created_at,
    l.updated_at AS updated_at,
    l.total_items AS total_items,
    l.completed_items AS completed_items,
    COUNT(i.id) AS live_total,
    COUNT(CASE WHEN i.is_checked = 1 THEN 1 END) AS live_completed
 FROM lists l
 LEFT JOIN list_items i
   ON i.list_id = l.id
  AND i.deleted_at IS NULL";

fn parse_list_row(row: &Row<'_>) -> RepoResult<List> {
    let id_text: String = row.get("id")?;
    Ok(List {
        id: parse_uuid(&id_text, "lists.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        total_items: row.get("total_items")?,
        completed_items: row.get("completed_items")?,
    })
}

fn parse_live_count_row(row: &Row<'_>) -> RepoResult<ListWithLiveCounts> {
    Ok(ListWithLiveCounts {
        list: parse_list_row(row)?,
        live_total: row.get("live_total")?,
        live_completed: row.get("live_completed")?,
    })
}
