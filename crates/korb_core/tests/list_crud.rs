use korb_core::db::open_db_in_memory;
use korb_core::{
    DeleteMode, FindOptions, ItemService, ItemSort, ListOrder, ListRepository, ListService,
    ListServiceError, ListUpdate, NewItemInput, SqliteListItemRepository, SqliteListRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

#[test]
fn create_list_trims_input_and_starts_with_zero_counters() {
    let conn = open_db_in_memory().unwrap();
    let service = list_service(&conn);

    let created = service
        .create_list("  Wocheneinkauf  ", Some("  für Samstag  ".to_string()))
        .unwrap();

    assert_eq!(created.name, "Wocheneinkauf");
    assert_eq!(created.description.as_deref(), Some("für Samstag"));
    assert_eq!(created.total_items, 0);
    assert_eq!(created.completed_items, 0);
    assert_eq!(created.created_at, created.updated_at);

    let fetched = service.get_list(created.id).unwrap().unwrap();
    assert_eq!(fetched, created);
}

#[test]
fn blank_list_name_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = list_service(&conn);

    let err = service.create_list("   ", None).unwrap_err();
    assert!(matches!(err, ListServiceError::InvalidName));
}

#[test]
fn update_applies_partial_patch_and_touches_updated_at() {
    let conn = open_db_in_memory().unwrap();
    let service = list_service(&conn);
    let created = service
        .create_list("Grillabend", Some("mit Nachbarn".to_string()))
        .unwrap();

    backdate_list(&conn, created.id);

    let updated = service
        .update_list(
            created.id,
            &ListUpdate {
                name: Some("Grillabend XL".to_string()),
                description: None,
            },
        )
        .unwrap();

    assert_eq!(updated.name, "Grillabend XL");
    assert_eq!(updated.description.as_deref(), Some("mit Nachbarn"));
    assert_ne!(updated.updated_at, BACKDATED_STAMP);
}

#[test]
fn blank_description_update_clears_the_column() {
    let conn = open_db_in_memory().unwrap();
    let service = list_service(&conn);
    let created = service
        .create_list("Partyeinkauf", Some("Getränke".to_string()))
        .unwrap();

    let updated = service
        .update_list(
            created.id,
            &ListUpdate {
                name: None,
                description: Some("   ".to_string()),
            },
        )
        .unwrap();

    assert_eq!(updated.description, None);
}

#[test]
fn empty_update_returns_the_current_row_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let service = list_service(&conn);
    let created = service.create_list("Wocheneinkauf", None).unwrap();

    let unchanged = service
        .update_list(created.id, &ListUpdate::default())
        .unwrap();

    assert_eq!(unchanged, created);
}

#[test]
fn updating_missing_list_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = list_service(&conn);

    let err = service
        .update_list(
            Uuid::new_v4(),
            &ListUpdate {
                name: Some("Geist".to_string()),
                description: None,
            },
        )
        .unwrap_err();

    assert!(matches!(err, ListServiceError::ListNotFound(_)));
}

#[test]
fn soft_delete_hides_the_list_and_restore_revives_it_with_fresh_counters() {
    let conn = open_db_in_memory().unwrap();
    let service = list_service(&conn);
    let items = ItemService::new(SqliteListItemRepository::try_new(&conn).unwrap());
    let created = service.create_list("Wocheneinkauf", None).unwrap();
    items
        .add_item(created.id, &named_item("Milch"))
        .unwrap();

    assert!(service.delete_list(created.id, DeleteMode::Soft).unwrap());
    assert!(service.get_list(created.id).unwrap().is_none());
    assert_eq!(service.get_all_lists().unwrap().len(), 0);

    let tombstones: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM lists WHERE id = ?1 AND deleted_at IS NOT NULL",
            [created.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tombstones, 1);

    // Poke the stored counters so restore provably recomputes them.
    conn.execute(
        "UPDATE lists SET total_items = 99, completed_items = 42 WHERE id = ?1",
        [created.id.to_string()],
    )
    .unwrap();

    assert!(service.restore_list(created.id).unwrap());
    let restored = service.get_list(created.id).unwrap().unwrap();
    assert_eq!(restored.total_items, 0);
    assert_eq!(restored.completed_items, 0);
}

#[test]
fn restoring_a_live_list_changes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = list_service(&conn);
    let created = service.create_list("Wocheneinkauf", None).unwrap();

    assert!(!service.restore_list(created.id).unwrap());
}

#[test]
fn hard_delete_removes_the_list_and_its_items_for_good() {
    let conn = open_db_in_memory().unwrap();
    let service = list_service(&conn);
    let items = ItemService::new(SqliteListItemRepository::try_new(&conn).unwrap());
    let created = service.create_list("Grillabend", None).unwrap();
    items
        .add_item(created.id, &named_item("Würstchen"))
        .unwrap();
    items
        .add_item(created.id, &named_item("Senf"))
        .unwrap();

    assert!(service.delete_list(created.id, DeleteMode::Hard).unwrap());

    assert_eq!(count_rows(&conn, "lists", created.id), 0);
    let orphaned: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM list_items WHERE list_id = ?1",
            [created.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphaned, 0);
}

#[test]
fn duplicate_list_copies_items_and_resets_checked_state() {
    let conn = open_db_in_memory().unwrap();
    let service = list_service(&conn);
    let items = ItemService::new(SqliteListItemRepository::try_new(&conn).unwrap());
    let source = service
        .create_list("Wocheneinkauf", Some("jede Woche".to_string()))
        .unwrap();
    let first = items
        .add_item(source.id, &named_item("Milch"))
        .unwrap();
    items
        .add_item(source.id, &named_item("Brot"))
        .unwrap();
    items.toggle_item(first.id).unwrap();

    let copy = service.duplicate_list(source.id, None).unwrap();

    assert_eq!(copy.name, "Wocheneinkauf (Copy)");
    assert_eq!(copy.description.as_deref(), Some("jede Woche"));
    assert_ne!(copy.id, source.id);
    assert_eq!(copy.total_items, 2);
    assert_eq!(copy.completed_items, 0);

    let copied_items = items
        .items_of_list(copy.id, ItemSort::Position)
        .unwrap();
    assert_eq!(copied_items.len(), 2);
    assert!(copied_items.iter().all(|item| !item.is_checked));
    assert_eq!(copied_items[0].name, "Milch");
    assert_eq!(copied_items[1].name, "Brot");

    // Source keeps its own state.
    let source_fresh = service.get_list(source.id).unwrap().unwrap();
    assert_eq!(source_fresh.completed_items, 1);
}

#[test]
fn duplicate_list_accepts_an_explicit_name() {
    let conn = open_db_in_memory().unwrap();
    let service = list_service(&conn);
    let source = service.create_list("Wocheneinkauf", None).unwrap();

    let copy = service
        .duplicate_list(source.id, Some("  Nächste Woche  ".to_string()))
        .unwrap();

    assert_eq!(copy.name, "Nächste Woche");
}

#[test]
fn get_all_supports_ordering_and_pagination() {
    let conn = open_db_in_memory().unwrap();
    let service = list_service(&conn);
    let repo = SqliteListRepository::try_new(&conn).unwrap();
    for name in ["Anton", "Clara", "Berta"] {
        service.create_list(name, None).unwrap();
    }

    let by_name = repo
        .get_all(&FindOptions {
            order: ListOrder::NameAsc,
            ..FindOptions::default()
        })
        .unwrap();
    let names: Vec<&str> = by_name.iter().map(|list| list.name.as_str()).collect();
    assert_eq!(names, ["Anton", "Berta", "Clara"]);

    let window = repo
        .get_all(&FindOptions {
            order: ListOrder::CreatedAsc,
            limit: Some(1),
            offset: 1,
        })
        .unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].name, "Clara");
}

#[test]
fn live_count_audit_matches_stored_counters() {
    let conn = open_db_in_memory().unwrap();
    let service = list_service(&conn);
    let items = ItemService::new(SqliteListItemRepository::try_new(&conn).unwrap());
    let repo = SqliteListRepository::try_new(&conn).unwrap();
    let created = service.create_list("Wocheneinkauf", None).unwrap();
    let first = items
        .add_item(created.id, &named_item("Milch"))
        .unwrap();
    items
        .add_item(created.id, &named_item("Brot"))
        .unwrap();
    items.toggle_item(first.id).unwrap();

    let audited = repo.get_with_live_counts(created.id).unwrap().unwrap();
    assert_eq!(audited.live_total, 2);
    assert_eq!(audited.live_completed, 1);
    assert_eq!(audited.list.total_items, audited.live_total);
    assert_eq!(audited.list.completed_items, audited.live_completed);

    let all_audited = repo.get_all_with_live_counts().unwrap();
    assert_eq!(all_audited.len(), 1);
    assert_eq!(all_audited[0].live_total, 2);
}

const BACKDATED_STAMP: &str = "2020-01-01T00:00:00.000Z";

fn backdate_list(conn: &Connection, id: Uuid) {
    conn.execute(
        "UPDATE lists SET created_at = ?2, updated_at = ?2 WHERE id = ?1",
        rusqlite::params![id.to_string(), BACKDATED_STAMP],
    )
    .unwrap();
}

fn count_rows(conn: &Connection, table: &str, id: Uuid) -> i64 {
    conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE id = ?1"),
        [id.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}

fn named_item(name: &str) -> NewItemInput {
    NewItemInput {
        name: name.to_string(),
        ..NewItemInput::default()
    }
}

fn list_service(
    conn: &Connection,
) -> ListService<SqliteListRepository<'_>, SqliteListItemRepository<'_>> {
    ListService::new(
        SqliteListRepository::try_new(conn).unwrap(),
        SqliteListItemRepository::try_new(conn).unwrap(),
    )
}
