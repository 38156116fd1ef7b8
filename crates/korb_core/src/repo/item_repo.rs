//! List item repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide persistence APIs for `list_items` rows.
//! - Own position allocation, the `checked_at` coupling and the parent
//!   counter recount.
//!
//! # Invariants
//! - New items are always inserted unchecked; `checked_at` is set exactly
//!   when `is_checked` flips to true.
//! - Any write that can change check state runs the recount; every other
//!   successful write still touches the parent list's `updated_at`.
//! - The recount statement is the only writer of the list counters.

use crate::model::list::{ItemId, ListId, ListItem};
use crate::model::units::{Category, Unit};
use crate::repo::base::{
    bool_to_int, ensure_schema_current, ensure_table, int_to_bool, new_entity_id, now_utc,
    parse_uuid, DeleteMode, RepoError, RepoResult, TableMapping,
};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};

const ITEM_COLUMNS: &str = "id, list_id, name, description, quantity, unit, category, \
     is_checked, notes, position, created_at, updated_at, checked_at";

const ITEM_MAPPING: TableMapping<ListItem> = TableMapping {
    table: "list_items",
    select_columns: ITEM_COLUMNS,
    parse_row: parse_item_row,
};

/// Input for item creation. Validation happens in the service layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewListItem {
    pub name: String,
    pub description: Option<String>,
    pub quantity: String,
    pub unit: Unit,
    pub category: Category,
    pub notes: Option<String>,
    /// Explicit position; `None` appends after the last live sibling.
    pub position: Option<i64>,
}

/// Typed partial update for one item row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListItemPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub quantity: Option<String>,
    pub unit: Option<Unit>,
    pub category: Option<Category>,
    pub is_checked: Option<bool>,
    pub notes: Option<Option<String>>,
    pub position: Option<i64>,
}

impl ListItemPatch {
    /// True when the patch carries no column at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.quantity.is_none()
            && self.unit.is_none()
            && self.category.is_none()
            && self.is_checked.is_none()
            && self.notes.is_none()
            && self.position.is_none()
    }
}

/// Orderings for item list reads. All fall back to position/creation
/// order for determinism.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemSort {
    /// Manual order.
    #[default]
    Position,
    /// Grouped by category, manual order within a category.
    Category,
    /// Alphabetical.
    Name,
    /// Unchecked first.
    Checked,
}

impl ItemSort {
    fn order_by_clause(self) -> &'static str {
        match self {
            Self::Position => "position ASC, created_at ASC",
            Self::Category => "category ASC, position ASC",
            Self::Name => "name ASC, position ASC",
            Self::Checked => "is_checked ASC, position ASC",
        }
    }
}

/// Repository interface for list item operations.
pub trait ListItemRepository {
    /// Creates one item at the end of the list and recounts the parent.
    fn create(&self, list_id: ListId, item: &NewListItem) -> RepoResult<ListItem>;
    /// Creates a batch in one transaction with a single recount.
    fn create_many(&self, list_id: ListId, items: &[NewListItem]) -> RepoResult<Vec<ListItem>>;
    /// Loads one live item by id.
    fn get(&self, id: ItemId) -> RepoResult<Option<ListItem>>;
    /// Lists live items of one list in the requested order.
    fn find_by_list_id(&self, list_id: ListId, sort: ItemSort) -> RepoResult<Vec<ListItem>>;
    /// Applies a partial update. Returns `false` for empty patches and
    /// missing rows.
    fn update(&self, id: ItemId, patch: &ListItemPatch) -> RepoResult<bool>;
    /// Flips the checked state of one item.
    fn toggle_checked(&self, id: ItemId) -> RepoResult<bool>;
    /// Rewrites positions to match the given id order, atomically.
    fn reorder_items(&self, list_id: ListId, ordered_ids: &[ItemId]) -> RepoResult<()>;
    /// Deletes one item in the requested mode.
    fn delete(&self, id: ItemId, mode: DeleteMode) -> RepoResult<bool>;
    /// Clears the soft-delete marker on one item.
    fn restore(&self, id: ItemId) -> RepoResult<bool>;
    /// Soft-deletes every checked item of one list.
    fn delete_checked_items(&self, list_id: ListId) -> RepoResult<u32>;
    /// Deletes every item of one list in the requested mode.
    fn delete_by_list_id(&self, list_id: ListId, mode: DeleteMode) -> RepoResult<u32>;
    /// Rewrites the parent's counters from the live item rows.
    fn recount(&self, list_id: ListId) -> RepoResult<()>;
}

/// SQLite-backed list item repository.
pub struct SqliteListItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteListItemRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_current(conn)?;
        ensure_table(
            conn,
            "list_items",
            &[
                "id",
                "list_id",
                "name",
                "description",
                "quantity",
                "unit",
                "category",
                "is_checked",
                "notes",
                "position",
                "created_at",
                "updated_at",
                "checked_at",
                "deleted_at",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl ListItemRepository for SqliteListItemRepository<'_> {
    fn create(&self, list_id: ListId, item: &NewListItem) -> RepoResult<ListItem> {
        let position = match item.position {
            Some(value) => value,
            None => next_position(self.conn, list_id)?,
        };
        let created = build_item(list_id, item, position);
        insert_item(self.conn, &created)?;
        recount_list(self.conn, list_id)?;
        Ok(created)
    }

    fn create_many(&self, list_id: ListId, items: &[NewListItem]) -> RepoResult<Vec<ListItem>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut next = next_position(&tx, list_id)?;
        let mut created = Vec::with_capacity(items.len());
        for item in items {
            let position = match item.position {
                Some(value) => value,
                None => {
                    let allocated = next;
                    next += 1;
                    allocated
                }
            };
            let row = build_item(list_id, item, position);
            insert_item(&tx, &row)?;
            created.push(row);
        }
        recount_list(&tx, list_id)?;
        tx.commit()?;
        Ok(created)
    }

    fn get(&self, id: ItemId) -> RepoResult<Option<ListItem>> {
        ITEM_MAPPING.find_by_id(self.conn, id)
    }

    fn find_by_list_id(&self, list_id: ListId, sort: ItemSort) -> RepoResult<Vec<ListItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS}
             FROM list_items
             WHERE list_id = ?1
               AND deleted_at IS NULL
             ORDER BY {order};",
            order = sort.order_by_clause(),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([list_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn update(&self, id: ItemId, patch: &ListItemPatch) -> RepoResult<bool> {
        if patch.is_empty() {
            return Ok(false);
        }
        let Some(list_id) = item_list_id(self.conn, id)? else {
            return Ok(false);
        };

        let mut assignments: Vec<&'static str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(name) = patch.name.as_ref() {
            assignments.push("name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        if let Some(description) = patch.description.as_ref() {
            assignments.push("description = ?");
            bind_values.push(nullable_text(description));
        }
        if let Some(quantity) = patch.quantity.as_ref() {
            assignments.push("quantity = ?");
            bind_values.push(Value::Text(quantity.clone()));
        }
        if let Some(unit) = patch.unit {
            assignments.push("unit = ?");
            bind_values.push(Value::Text(unit.as_str().to_string()));
        }
        if let Some(category) = patch.category {
            assignments.push("category = ?");
            bind_values.push(Value::Text(category.as_str().to_string()));
        }
        if let Some(is_checked) = patch.is_checked {
            assignments.push("is_checked = ?");
            bind_values.push(Value::Integer(bool_to_int(is_checked)));
            assignments.push("checked_at = ?");
            bind_values.push(if is_checked {
                Value::Text(now_utc())
            } else {
                Value::Null
            });
        }
        if let Some(notes) = patch.notes.as_ref() {
            assignments.push("notes = ?");
            bind_values.push(nullable_text(notes));
        }
        if let Some(position) = patch.position {
            assignments.push("position = ?");
            bind_values.push(Value::Integer(position));
        }
        assignments.push("updated_at = ?");
        bind_values.push(Value::Text(now_utc()));

        let sql = format!(
            "UPDATE list_items
             SET {assignments}
             WHERE id = ?
               AND deleted_at IS NULL;",
            assignments = assignments.join(", "),
        );
        bind_values.push(Value::Text(id.to_string()));
        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Ok(false);
        }

        if patch.is_checked.is_some() {
            recount_list(self.conn, list_id)?;
        } else {
            touch_list(self.conn, list_id)?;
        }
        Ok(true)
    }

    fn toggle_checked(&self, id: ItemId) -> RepoResult<bool> {
        let current: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT list_id, is_checked
                 FROM list_items
                 WHERE id = ?1
                   AND deleted_at IS NULL;",
                [id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((list_id_text, checked_flag)) = current else {
            return Ok(false);
        };
        let list_id = parse_uuid(&list_id_text, "list_items.list_id")?;
        let next_checked = !int_to_bool(checked_flag, "list_items.is_checked")?;

        let now = now_utc();
        self.conn.execute(
            "UPDATE list_items
             SET is_checked = ?2,
                 checked_at = ?3,
                 updated_at = ?4
             WHERE id = ?1
               AND deleted_at IS NULL;",
            params![
                id.to_string(),
                bool_to_int(next_checked),
                if next_checked { Some(now.as_str()) } else { None },
                now,
            ],
        )?;
        recount_list(self.conn, list_id)?;
        Ok(true)
    }

    fn reorder_items(&self, list_id: ListId, ordered_ids: &[ItemId]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for (index, item_id) in ordered_ids.iter().enumerate() {
            tx.execute(
                "UPDATE list_items
                 SET position = ?3,
                     updated_at = ?4
                 WHERE id = ?1
                   AND list_id = ?2
                   AND deleted_at IS NULL;",
                params![
                    item_id.to_string(),
                    list_id.to_string(),
                    index as i64,
                    now_utc(),
                ],
            )?;
        }
        touch_list(&tx, list_id)?;
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, id: ItemId, mode: DeleteMode) -> RepoResult<bool> {
        let Some(list_id) = item_list_id(self.conn, id)? else {
            return Ok(false);
        };
        let deleted = ITEM_MAPPING.delete(self.conn, id, mode)?;
        if deleted {
            recount_list(self.conn, list_id)?;
        }
        Ok(deleted)
    }

    fn restore(&self, id: ItemId) -> RepoResult<bool> {
        let Some(list_id) = item_list_id(self.conn, id)? else {
            return Ok(false);
        };
        let restored = ITEM_MAPPING.restore(self.conn, id)?;
        if restored {
            recount_list(self.conn, list_id)?;
        }
        Ok(restored)
    }

    fn delete_checked_items(&self, list_id: ListId) -> RepoResult<u32> {
        let changed = self.conn.execute(
            "UPDATE list_items
             SET deleted_at = ?2,
                 updated_at = ?2
             WHERE list_id = ?1
               AND is_checked = 1
               AND deleted_at IS NULL;",
            params![list_id.to_string(), now_utc()],
        )?;
        if changed > 0 {
            recount_list(self.conn, list_id)?;
        }
        Ok(changed as u32)
    }

    fn delete_by_list_id(&self, list_id: ListId, mode: DeleteMode) -> RepoResult<u32> {
        let changed = match mode {
            DeleteMode::Soft => self.conn.execute(
                "UPDATE list_items
                 SET deleted_at = ?2,
                     updated_at = ?2
                 WHERE list_id = ?1
                   AND deleted_at IS NULL;",
                params![list_id.to_string(), now_utc()],
            )?,
            DeleteMode::Hard => self.conn.execute(
                "DELETE FROM list_items WHERE list_id = ?1;",
                [list_id.to_string()],
            )?,
        };
        if changed > 0 {
            recount_list(self.conn, list_id)?;
        }
        Ok(changed as u32)
    }

    fn recount(&self, list_id: ListId) -> RepoResult<()> {
        recount_list(self.conn, list_id)
    }
}

fn build_item(list_id: ListId, item: &NewListItem, position: i64) -> ListItem {
    let now = now_utc();
    ListItem {
        id: new_entity_id(),
        list_id,
        name: item.name.clone(),
        description: item.description.clone(),
        quantity: item.quantity.clone(),
        unit: item.unit,
        category: item.category,
        is_checked: false,
        notes: item.notes.clone(),
        position,
        created_at: now.clone(),
        updated_at: now,
        checked_at: None,
    }
}

fn insert_item(conn: &Connection, item: &ListItem) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO list_items (
            id,
            list_id,
            name,
            description,
            quantity,
            unit,
            category,
            is_checked,
            notes,
            position,
            created_at,
            updated_at,
            checked_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?10, ?11, NULL);",
        params![
            item.id.to_string(),
            item.list_id.to_string(),
            item.name,
            item.description,
            item.quantity,
            item.unit.as_str(),
            item.category.as_str(),
            item.notes,
            item.position,
            item.created_at,
            item.updated_at,
        ],
    )?;
    Ok(())
}

/// Next append position: max over live siblings plus one, 1 for the first
/// item.
fn next_position(conn: &Connection, list_id: ListId) -> RepoResult<i64> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(position), 0) + 1
         FROM list_items
         WHERE list_id = ?1
           AND deleted_at IS NULL;",
        [list_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(next)
}

fn item_list_id(conn: &Connection, id: ItemId) -> RepoResult<Option<ListId>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT list_id FROM list_items WHERE id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    value
        .map(|text| parse_uuid(&text, "list_items.list_id"))
        .transpose()
}

/// Rewrites both counters and `updated_at` on the parent row from the
/// live items. Single authoritative counter write path.
fn recount_list(conn: &Connection, list_id: ListId) -> RepoResult<()> {
    conn.execute(
        "UPDATE lists
         SET total_items = (
                SELECT COUNT(*)
                FROM list_items
                WHERE list_id = ?1
                  AND deleted_at IS NULL
             ),
             completed_items = (
                SELECT COUNT(*)
                FROM list_items
                WHERE list_id = ?1
                  AND deleted_at IS NULL
                  AND is_checked = 1
             ),
             updated_at = ?2
         WHERE id = ?1
           AND deleted_at IS NULL;",
        params![list_id.to_string(), now_utc()],
    )?;
    Ok(())
}

fn touch_list(conn: &Connection, list_id: ListId) -> RepoResult<()> {
    conn.execute(
        "UPDATE lists
         SET updated_at = ?2
         WHERE id = ?1
           AND deleted_at IS NULL;",
        params![list_id.to_string(), now_utc()],
    )?;
    Ok(())
}

fn nullable_text(value: &Option<String>) -> Value {
    match value {
        Some(text) => Value::Text(text.clone()),
        None => Value::Null,
    }
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<ListItem> {
    let id_text: String = row.get("id")?;
    let list_id_text: String = row.get("list_id")?;
    let unit_text: String = row.get("unit")?;
    let unit = Unit::parse(&unit_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid unit `{unit_text}` in list_items.unit"))
    })?;
    let category_text: String = row.get("category")?;
    let category = Category::parse(&category_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid category `{category_text}` in list_items.category"
        ))
    })?;

    Ok(ListItem {
        id: parse_uuid(&id_text, "list_items.id")?,
        list_id: parse_uuid(&list_id_text, "list_items.list_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        quantity: row.get("quantity")?,
        unit,
        category,
        is_checked: int_to_bool(row.get("is_checked")?, "list_items.is_checked")?,
        notes: row.get("notes")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        checked_at: row.get("checked_at")?,
    })
}
