//! Use-case API exported to the Flutter app through FRB.
//!
//! # Responsibility
//! - Wrap core services in flat request/response shapes Dart can hold.
//! - Keep error semantics simple for the UI: `ok` flag plus a message.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Every call opens the app database and applies pending migrations
//!   before touching data.

use korb_core::db::open_db;
use korb_core::{
    core_version as core_version_inner, default_log_level, init_logging as init_logging_inner,
    ping as ping_inner, render_export, ItemService, ListService, RecipeService, RepoError,
    SqliteListItemRepository, SqliteListRepository, SqliteRecipeRepository, TransferService,
};
use log::warn;
use rusqlite::Connection;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

const APP_DB_FILE_NAME: &str = "korb.sqlite3";
static APP_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Bridge liveness probe; the app calls this during startup smoke checks.
///
/// # FFI contract
/// - Sync call, non-blocking, never throws.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Core crate version for the diagnostics screen.
///
/// # FFI contract
/// - Sync call, non-blocking, never throws.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Starts rolling file logging for the Rust side, once per process.
///
/// `level` is one of `trace|debug|info|warn|error` (case-insensitive); a
/// blank level falls back to the build-mode default. `log_dir` is an
/// absolute directory the app owns.
///
/// # FFI contract
/// - Sync call; creates the log directory if needed.
/// - Repeat calls with the same configuration are no-ops; switching level
///   or directory after init is rejected.
/// - Never panics; returns an empty string on success, the error text
///   otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    let effective_level = if level.trim().is_empty() {
        default_log_level()
    } else {
        level.as_str()
    };
    match init_logging_inner(effective_level, log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Command response for list-level operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListActionResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Created or affected list ID in string form.
    pub list_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl ListActionResponse {
    fn success(message: impl Into<String>, list_id: String) -> Self {
        Self {
            ok: true,
            list_id: Some(list_id),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            list_id: None,
            message: message.into(),
        }
    }
}

/// Response for the free-text quick-add flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickAddResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Number of items that landed on the list.
    pub added_count: u32,
    /// IDs of the created items in input order.
    pub item_ids: Vec<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl QuickAddResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            added_count: 0,
            item_ids: Vec::new(),
            message: message.into(),
        }
    }
}

/// Response for the item check-off flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleItemResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Checked state after the toggle.
    pub is_checked: Option<bool>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

/// One list row in the overview response.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOverview {
    /// Stable list ID in string form.
    pub list_id: String,
    /// Display name of the list.
    pub name: String,
    /// Number of live items on the list.
    pub total_items: i64,
    /// Number of checked live items on the list.
    pub completed_items: i64,
    /// Completion percentage between 0 and 100.
    pub progress_percent: f64,
}

/// Overview response for the list screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ListsOverviewResponse {
    /// All live lists, most recently updated first.
    pub lists: Vec<ListOverview>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

/// Response carrying a rendered export document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJsonResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Pretty-printed export JSON on success.
    pub json: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

/// Response summarizing one import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJsonResponse {
    /// Whether the document was accepted at all.
    pub ok: bool,
    /// Number of lists that imported successfully.
    pub lists_imported: u32,
    /// Number of recipes that imported successfully.
    pub recipes_imported: u32,
    /// One message per entry that failed to import.
    pub errors: Vec<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

/// Creates a shopping list.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Returns operation result and created list ID on success.
#[flutter_rust_bridge::frb(sync)]
pub fn create_list(name: String, description: Option<String>) -> ListActionResponse {
    let result = with_list_service(|service| {
        service
            .create_list(name, description)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(list) => ListActionResponse::success("List created.", list.id.to_string()),
        Err(err) => ListActionResponse::failure(fail("create_list", err)),
    }
}

/// Parses free-text lines (one item per line) and adds them to a list.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Unparseable lines become `1 Stück` items; failed lines are skipped.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn quick_add_items(list_id: String, text: String) -> QuickAddResponse {
    let list_id = match Uuid::parse_str(list_id.trim()) {
        Ok(id) => id,
        Err(err) => {
            return QuickAddResponse::failure(fail(
                "quick_add_items",
                format!("bad list id: {err}"),
            ))
        }
    };
    match with_item_service(|service| Ok(service.parse_and_add_items(list_id, &text))) {
        Ok(items) => QuickAddResponse {
            ok: true,
            added_count: items.len() as u32,
            item_ids: items.iter().map(|item| item.id.to_string()).collect(),
            message: format!("Added {} item(s).", items.len()),
        },
        Err(err) => QuickAddResponse::failure(fail("quick_add_items", err)),
    }
}

/// Flips the checked state of one item.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Returns the checked state after the toggle.
#[flutter_rust_bridge::frb(sync)]
pub fn toggle_item(item_id: String) -> ToggleItemResponse {
    let item_id = match Uuid::parse_str(item_id.trim()) {
        Ok(id) => id,
        Err(err) => {
            return ToggleItemResponse {
                ok: false,
                is_checked: None,
                message: fail("toggle_item", format!("bad item id: {err}")),
            }
        }
    };
    match with_item_service(|service| service.toggle_item(item_id).map_err(|err| err.to_string())) {
        Ok(item) => ToggleItemResponse {
            ok: true,
            is_checked: Some(item.is_checked),
            message: "Item toggled.".to_string(),
        },
        Err(err) => ToggleItemResponse {
            ok: false,
            is_checked: None,
            message: fail("toggle_item", err),
        },
    }
}

/// Returns all live lists with their item counters.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Counters come from the denormalized list columns.
#[flutter_rust_bridge::frb(sync)]
pub fn lists_overview() -> ListsOverviewResponse {
    match with_list_service(|service| service.get_all_lists().map_err(|err| err.to_string())) {
        Ok(lists) => {
            let lists = lists
                .iter()
                .map(|list| ListOverview {
                    list_id: list.id.to_string(),
                    name: list.name.clone(),
                    total_items: list.total_items,
                    completed_items: list.completed_items,
                    progress_percent: list.progress(),
                })
                .collect::<Vec<_>>();
            let message = format!("Found {} list(s).", lists.len());
            ListsOverviewResponse { lists, message }
        }
        Err(err) => ListsOverviewResponse {
            lists: Vec::new(),
            message: fail("lists_overview", err),
        },
    }
}

/// Exports every live list and recipe as pretty-printed JSON.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn export_all_json() -> ExportJsonResponse {
    let result = with_transfer_service(|service| {
        let envelope = service.export_all().map_err(|err| err.to_string())?;
        render_export(&envelope).map_err(|err| err.to_string())
    });
    match result {
        Ok(json) => ExportJsonResponse {
            ok: true,
            json: Some(json),
            message: "Export rendered.".to_string(),
        },
        Err(err) => ExportJsonResponse {
            ok: false,
            json: None,
            message: fail("export_all_json", err),
        },
    }
}

/// Imports an export document best-effort.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - A rejected document imports nothing; a failed entry never aborts the
///   remaining entries.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn import_json(json: String) -> ImportJsonResponse {
    let result =
        with_transfer_service(|service| service.import_json(&json).map_err(|err| err.to_string()));
    match result {
        Ok(report) => ImportJsonResponse {
            ok: true,
            lists_imported: report.lists_imported() as u32,
            recipes_imported: report.recipes_imported() as u32,
            errors: report.failure_messages(),
            message: format!(
                "Imported {} list(s) and {} recipe(s).",
                report.lists_imported(),
                report.recipes_imported()
            ),
        },
        Err(err) => ImportJsonResponse {
            ok: false,
            lists_imported: 0,
            recipes_imported: 0,
            errors: Vec::new(),
            message: fail("import_json", err),
        },
    }
}

fn resolve_app_db_path() -> PathBuf {
    APP_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("KORB_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(APP_DB_FILE_NAME)
        })
        .clone()
}

fn open_app_db() -> Result<Connection, String> {
    let db_path = resolve_app_db_path();
    open_db(&db_path).map_err(|err| format!("app DB open failed: {err}"))
}

fn init_err(err: RepoError) -> String {
    format!("repo init failed: {err}")
}

fn fail(op: &'static str, err: impl Display) -> String {
    warn!("event=ffi_call_failed module=ffi op={op} error={err}");
    format!("{op} failed: {err}")
}

fn with_list_service<T>(
    f: impl FnOnce(
        &ListService<SqliteListRepository<'_>, SqliteListItemRepository<'_>>,
    ) -> Result<T, String>,
) -> Result<T, String> {
    let conn = open_app_db()?;
    let lists = SqliteListRepository::try_new(&conn).map_err(init_err)?;
    let items = SqliteListItemRepository::try_new(&conn).map_err(init_err)?;
    f(&ListService::new(lists, items))
}

fn with_item_service<T>(
    f: impl FnOnce(&ItemService<SqliteListItemRepository<'_>>) -> Result<T, String>,
) -> Result<T, String> {
    let conn = open_app_db()?;
    let items = SqliteListItemRepository::try_new(&conn).map_err(init_err)?;
    f(&ItemService::new(items))
}

fn with_transfer_service<T>(
    f: impl FnOnce(
        &TransferService<
            SqliteListRepository<'_>,
            SqliteListItemRepository<'_>,
            SqliteRecipeRepository<'_>,
        >,
    ) -> Result<T, String>,
) -> Result<T, String> {
    let conn = open_app_db()?;
    let list_service = ListService::new(
        SqliteListRepository::try_new(&conn).map_err(init_err)?,
        SqliteListItemRepository::try_new(&conn).map_err(init_err)?,
    );
    let item_service = ItemService::new(SqliteListItemRepository::try_new(&conn).map_err(init_err)?);
    let recipe_service = RecipeService::new(
        SqliteRecipeRepository::try_new(&conn).map_err(init_err)?,
        SqliteListRepository::try_new(&conn).map_err(init_err)?,
        SqliteListItemRepository::try_new(&conn).map_err(init_err)?,
    );
    f(&TransferService::new(
        list_service,
        item_service,
        recipe_service,
    ))
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, create_list, export_all_json, import_json, init_logging, lists_overview,
        ping, quick_add_items, toggle_item,
    };
    use korb_core::db::open_db;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_answers_across_the_bridge() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn core_version_looks_like_semver() {
        assert!(core_version().contains('.'));
    }

    #[test]
    fn init_logging_reports_a_blank_directory() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_reports_an_unknown_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn create_list_rejects_blank_name() {
        let response = create_list("   ".to_string(), None);
        assert!(!response.ok);
        assert!(response.list_id.is_none());
        assert!(response.message.contains("name"));
    }

    #[test]
    fn quick_add_rejects_malformed_list_id() {
        let response = quick_add_items("not-a-uuid".to_string(), "Milch".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("bad list id"));
    }

    #[test]
    fn quick_add_parses_lines_and_updates_overview_counters() {
        let name = unique_token("ffi-overview");
        let created = create_list(name, None);
        assert!(created.ok, "{}", created.message);
        let list_id = created.list_id.clone().expect("created list id");

        let added = quick_add_items(list_id.clone(), "2 kg Kartoffeln\n\nMilch".to_string());
        assert!(added.ok, "{}", added.message);
        assert_eq!(added.added_count, 2);

        let overview = lists_overview();
        let row = overview
            .lists
            .iter()
            .find(|list| list.list_id == list_id)
            .expect("created list should appear in overview");
        assert_eq!(row.total_items, 2);
        assert_eq!(row.completed_items, 0);
        assert_eq!(row.progress_percent, 0.0);

        let conn = open_db(super::resolve_app_db_path()).expect("open db");
        let (quantity, unit): (String, String) = conn
            .query_row(
                "SELECT quantity, unit FROM list_items WHERE list_id = ?1 AND name = 'Kartoffeln'",
                [list_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("query parsed item row");
        assert_eq!(quantity, "2");
        assert_eq!(unit, "kg");
    }

    #[test]
    fn toggle_item_flips_checked_state_both_ways() {
        let created = create_list(unique_token("ffi-toggle"), None);
        assert!(created.ok, "{}", created.message);
        let list_id = created.list_id.expect("created list id");

        let added = quick_add_items(list_id, "Milch".to_string());
        assert_eq!(added.added_count, 1);
        let item_id = added.item_ids[0].clone();

        let first = toggle_item(item_id.clone());
        assert!(first.ok, "{}", first.message);
        assert_eq!(first.is_checked, Some(true));

        let second = toggle_item(item_id);
        assert!(second.ok, "{}", second.message);
        assert_eq!(second.is_checked, Some(false));
    }

    #[test]
    fn export_includes_created_lists() {
        let name = unique_token("ffi-export");
        let created = create_list(name.clone(), None);
        assert!(created.ok, "{}", created.message);

        let response = export_all_json();
        assert!(response.ok, "{}", response.message);
        let json = response.json.expect("export json");
        assert!(json.contains(&name));
        assert!(json.contains("\"version\""));
    }

    #[test]
    fn import_json_reports_per_document_counts() {
        let name = unique_token("ffi-import");
        let document = format!(
            r#"{{
                "version": "1.0.0",
                "exportedAt": "2024-06-01T10:00:00.000Z",
                "lists": [{{"name": "{name}", "items": [{{"name": "Brot"}}]}}],
                "recipes": []
            }}"#
        );

        let response = import_json(document);
        assert!(response.ok, "{}", response.message);
        assert_eq!(response.lists_imported, 1);
        assert_eq!(response.recipes_imported, 0);
        assert!(response.errors.is_empty());

        let overview = lists_overview();
        assert!(overview.lists.iter().any(|list| list.name == name));
    }

    #[test]
    fn import_json_rejects_malformed_document() {
        let response = import_json("{not json".to_string());
        assert!(!response.ok);
        assert_eq!(response.lists_imported, 0);
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before unix epoch")
            .as_nanos();
        format!("{prefix}-{}-{nanos}", std::process::id())
    }
}
