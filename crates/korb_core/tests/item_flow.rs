use korb_core::db::open_db_in_memory;
use korb_core::{
    Category, DeleteMode, ItemService, ItemServiceError, ItemSort, ItemUpdate, ListRepository,
    ListService, NewItemInput, SqliteListItemRepository, SqliteListRepository, Unit,
};
use rusqlite::Connection;
use uuid::Uuid;

#[test]
fn add_item_fills_defaults_and_assigns_sequential_positions() {
    let conn = open_db_in_memory().unwrap();
    let list_id = seeded_list(&conn);
    let items = item_service(&conn);

    let first = items.add_item(list_id, &named_item("Milch")).unwrap();
    assert_eq!(first.quantity, "1");
    assert_eq!(first.unit, Unit::Piece);
    assert_eq!(first.category, Category::Grains);
    assert!(!first.is_checked);
    assert_eq!(first.checked_at, None);
    assert_eq!(first.position, 1);

    let second = items
        .add_item(
            list_id,
            &NewItemInput {
                name: "Mehl".to_string(),
                quantity: Some("2".to_string()),
                unit: Some(Unit::Kilogram),
                category: Some(Category::Baking),
                notes: Some("  Type 405  ".to_string()),
            },
        )
        .unwrap();
    assert_eq!(second.quantity, "2");
    assert_eq!(second.unit, Unit::Kilogram);
    assert_eq!(second.category, Category::Baking);
    assert_eq!(second.notes.as_deref(), Some("Type 405"));
    assert_eq!(second.position, 2);

    let third = items.add_item(list_id, &named_item("Eier")).unwrap();
    assert_eq!(third.position, 3);

    assert_eq!(stored_counters(&conn, list_id), (3, 0));
}

#[test]
fn blank_item_name_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let list_id = seeded_list(&conn);
    let items = item_service(&conn);

    let err = items.add_item(list_id, &named_item("   ")).unwrap_err();
    assert!(matches!(err, ItemServiceError::InvalidName));
}

#[test]
fn blank_quantity_falls_back_to_one() {
    let conn = open_db_in_memory().unwrap();
    let list_id = seeded_list(&conn);
    let items = item_service(&conn);

    let created = items
        .add_item(
            list_id,
            &NewItemInput {
                name: "Butter".to_string(),
                quantity: Some("   ".to_string()),
                ..NewItemInput::default()
            },
        )
        .unwrap();

    assert_eq!(created.quantity, "1");
}

#[test]
fn toggle_updates_counters_and_checked_at_both_ways() {
    let conn = open_db_in_memory().unwrap();
    let list_id = seeded_list(&conn);
    let items = item_service(&conn);
    let created = items.add_item(list_id, &named_item("Milch")).unwrap();
    items.add_item(list_id, &named_item("Brot")).unwrap();

    let checked = items.toggle_item(created.id).unwrap();
    assert!(checked.is_checked);
    assert!(checked.checked_at.is_some());
    assert_eq!(stored_counters(&conn, list_id), (2, 1));

    let unchecked = items.toggle_item(created.id).unwrap();
    assert!(!unchecked.is_checked);
    assert_eq!(unchecked.checked_at, None);
    assert_eq!(stored_counters(&conn, list_id), (2, 0));
}

#[test]
fn toggling_missing_item_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    seeded_list(&conn);
    let items = item_service(&conn);

    let err = items.toggle_item(Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, ItemServiceError::ItemNotFound(_)));
}

#[test]
fn update_couples_checked_at_with_is_checked() {
    let conn = open_db_in_memory().unwrap();
    let list_id = seeded_list(&conn);
    let items = item_service(&conn);
    let created = items.add_item(list_id, &named_item("Milch")).unwrap();

    let checked = items
        .update_item(
            created.id,
            &ItemUpdate {
                is_checked: Some(true),
                ..ItemUpdate::default()
            },
        )
        .unwrap();
    assert!(checked.is_checked);
    assert!(checked.checked_at.is_some());
    assert_eq!(stored_counters(&conn, list_id), (1, 1));

    let unchecked = items
        .update_item(
            created.id,
            &ItemUpdate {
                is_checked: Some(false),
                ..ItemUpdate::default()
            },
        )
        .unwrap();
    assert!(!unchecked.is_checked);
    assert_eq!(unchecked.checked_at, None);
    assert_eq!(stored_counters(&conn, list_id), (1, 0));
}

#[test]
fn update_trims_name_and_clears_blank_notes() {
    let conn = open_db_in_memory().unwrap();
    let list_id = seeded_list(&conn);
    let items = item_service(&conn);
    let created = items
        .add_item(
            list_id,
            &NewItemInput {
                name: "Milch".to_string(),
                notes: Some("Bio".to_string()),
                ..NewItemInput::default()
            },
        )
        .unwrap();

    let updated = items
        .update_item(
            created.id,
            &ItemUpdate {
                name: Some("  Hafermilch  ".to_string()),
                notes: Some("   ".to_string()),
                ..ItemUpdate::default()
            },
        )
        .unwrap();

    assert_eq!(updated.name, "Hafermilch");
    assert_eq!(updated.notes, None);
}

#[test]
fn updating_missing_item_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    seeded_list(&conn);
    let items = item_service(&conn);

    let err = items
        .update_item(
            Uuid::new_v4(),
            &ItemUpdate {
                name: Some("Geist".to_string()),
                ..ItemUpdate::default()
            },
        )
        .unwrap_err();

    assert!(matches!(err, ItemServiceError::ItemNotFound(_)));
}

#[test]
fn stored_counters_match_the_live_join_after_mixed_operations() {
    let conn = open_db_in_memory().unwrap();
    let list_id = seeded_list(&conn);
    let items = item_service(&conn);
    let lists = SqliteListRepository::try_new(&conn).unwrap();

    let milk = items.add_item(list_id, &named_item("Milch")).unwrap();
    let bread = items.add_item(list_id, &named_item("Brot")).unwrap();
    items.add_item(list_id, &named_item("Eier")).unwrap();
    items.toggle_item(milk.id).unwrap();
    items.toggle_item(bread.id).unwrap();
    items.delete_item(bread.id, DeleteMode::Soft).unwrap();

    let audited = lists.get_with_live_counts(list_id).unwrap().unwrap();
    assert_eq!(audited.live_total, 2);
    assert_eq!(audited.live_completed, 1);
    assert_eq!(audited.list.total_items, 2);
    assert_eq!(audited.list.completed_items, 1);
}

#[test]
fn reorder_rewrites_the_relative_order() {
    let conn = open_db_in_memory().unwrap();
    let list_id = seeded_list(&conn);
    let items = item_service(&conn);
    let a = items.add_item(list_id, &named_item("Milch")).unwrap();
    let b = items.add_item(list_id, &named_item("Brot")).unwrap();
    let c = items.add_item(list_id, &named_item("Eier")).unwrap();

    items.reorder_items(list_id, &[c.id, a.id, b.id]).unwrap();

    let ordered = items.items_of_list(list_id, ItemSort::Position).unwrap();
    let names: Vec<&str> = ordered.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, ["Eier", "Milch", "Brot"]);
}

#[test]
fn failed_reorder_rolls_back_every_position_write() {
    let conn = open_db_in_memory().unwrap();
    let list_id = seeded_list(&conn);
    let items = item_service(&conn);
    let a = items.add_item(list_id, &named_item("Milch")).unwrap();
    let b = items.add_item(list_id, &named_item("Brot")).unwrap();
    let c = items.add_item(list_id, &named_item("Eier")).unwrap();

    // Abort the transaction mid-way through the position writes.
    conn.execute_batch(
        "CREATE TRIGGER force_reorder_failure
         BEFORE UPDATE OF position ON list_items
         WHEN NEW.position = 1
         BEGIN
             SELECT RAISE(ABORT, 'forced failure');
         END;",
    )
    .unwrap();

    assert!(items.reorder_items(list_id, &[c.id, a.id, b.id]).is_err());
    conn.execute_batch("DROP TRIGGER force_reorder_failure;")
        .unwrap();

    let ordered = items.items_of_list(list_id, ItemSort::Position).unwrap();
    let names: Vec<&str> = ordered.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, ["Milch", "Brot", "Eier"]);
}

#[test]
fn delete_checked_items_removes_only_checked_rows() {
    let conn = open_db_in_memory().unwrap();
    let list_id = seeded_list(&conn);
    let list_service = ListService::new(
        SqliteListRepository::try_new(&conn).unwrap(),
        SqliteListItemRepository::try_new(&conn).unwrap(),
    );
    let items = item_service(&conn);
    let milk = items.add_item(list_id, &named_item("Milch")).unwrap();
    let bread = items.add_item(list_id, &named_item("Brot")).unwrap();
    items.add_item(list_id, &named_item("Eier")).unwrap();
    items.toggle_item(milk.id).unwrap();
    items.toggle_item(bread.id).unwrap();

    let removed = list_service.clear_checked_items(list_id).unwrap();

    assert_eq!(removed, 2);
    let remaining = items.items_of_list(list_id, ItemSort::Position).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "Eier");
    assert_eq!(stored_counters(&conn, list_id), (1, 0));
}

#[test]
fn uncheck_all_reports_how_many_items_changed() {
    let conn = open_db_in_memory().unwrap();
    let list_id = seeded_list(&conn);
    let list_service = ListService::new(
        SqliteListRepository::try_new(&conn).unwrap(),
        SqliteListItemRepository::try_new(&conn).unwrap(),
    );
    let items = item_service(&conn);
    let milk = items.add_item(list_id, &named_item("Milch")).unwrap();
    let bread = items.add_item(list_id, &named_item("Brot")).unwrap();
    items.add_item(list_id, &named_item("Eier")).unwrap();
    items.toggle_item(milk.id).unwrap();
    items.toggle_item(bread.id).unwrap();

    let unchecked = list_service.uncheck_all_items(list_id).unwrap();

    assert_eq!(unchecked, 2);
    assert_eq!(stored_counters(&conn, list_id), (3, 0));
    let rows = items.items_of_list(list_id, ItemSort::Position).unwrap();
    assert!(rows.iter().all(|item| !item.is_checked));
}

#[test]
fn soft_deleted_item_is_hidden_and_restore_recounts() {
    let conn = open_db_in_memory().unwrap();
    let list_id = seeded_list(&conn);
    let items = item_service(&conn);
    let milk = items.add_item(list_id, &named_item("Milch")).unwrap();
    items.add_item(list_id, &named_item("Brot")).unwrap();

    assert!(items.delete_item(milk.id, DeleteMode::Soft).unwrap());
    assert!(items.get_item(milk.id).unwrap().is_none());
    assert_eq!(
        items.items_of_list(list_id, ItemSort::Position).unwrap().len(),
        1
    );
    assert_eq!(stored_counters(&conn, list_id), (1, 0));

    assert!(items.restore_item(milk.id).unwrap());
    assert_eq!(
        items.items_of_list(list_id, ItemSort::Position).unwrap().len(),
        2
    );
    assert_eq!(stored_counters(&conn, list_id), (2, 0));
}

#[test]
fn add_many_items_skips_invalid_entries_instead_of_failing() {
    let conn = open_db_in_memory().unwrap();
    let list_id = seeded_list(&conn);
    let items = item_service(&conn);

    let created = items.add_many_items(
        list_id,
        &[named_item("Milch"), named_item("   "), named_item("Brot")],
    );

    assert_eq!(created.len(), 2);
    assert_eq!(stored_counters(&conn, list_id), (2, 0));
}

#[test]
fn parse_and_add_items_parses_quantity_unit_and_category() {
    let conn = open_db_in_memory().unwrap();
    let list_id = seeded_list(&conn);
    let items = item_service(&conn);

    let created = items.parse_and_add_items(list_id, "2 kg Kartoffeln\nMilch\n1,5 l Wasser\n");

    assert_eq!(created.len(), 3);

    assert_eq!(created[0].name, "Kartoffeln");
    assert_eq!(created[0].quantity, "2");
    assert_eq!(created[0].unit, Unit::Kilogram);
    assert_eq!(created[0].category, Category::Vegetables);

    assert_eq!(created[1].name, "Milch");
    assert_eq!(created[1].quantity, "1");
    assert_eq!(created[1].unit, Unit::Piece);
    assert_eq!(created[1].category, Category::Dairy);

    assert_eq!(created[2].name, "Wasser");
    assert_eq!(created[2].quantity, "1.5");
    assert_eq!(created[2].unit, Unit::Liter);
    assert_eq!(created[2].category, Category::Beverages);

    assert_eq!(stored_counters(&conn, list_id), (3, 0));
}

#[test]
fn items_can_be_listed_in_name_order() {
    let conn = open_db_in_memory().unwrap();
    let list_id = seeded_list(&conn);
    let items = item_service(&conn);
    items.add_item(list_id, &named_item("Zucker")).unwrap();
    items.add_item(list_id, &named_item("Apfel")).unwrap();
    items.add_item(list_id, &named_item("Mehl")).unwrap();

    let by_name = items.items_of_list(list_id, ItemSort::Name).unwrap();
    let names: Vec<&str> = by_name.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, ["Apfel", "Mehl", "Zucker"]);
}

fn named_item(name: &str) -> NewItemInput {
    NewItemInput {
        name: name.to_string(),
        ..NewItemInput::default()
    }
}

fn stored_counters(conn: &Connection, list_id: Uuid) -> (i64, i64) {
    conn.query_row(
        "SELECT total_items, completed_items FROM lists WHERE id = ?1",
        [list_id.to_string()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .unwrap()
}

fn seeded_list(conn: &Connection) -> Uuid {
    let service = ListService::new(
        SqliteListRepository::try_new(conn).unwrap(),
        SqliteListItemRepository::try_new(conn).unwrap(),
    );
    service.create_list("Wocheneinkauf", None).unwrap().id
}

fn item_service(conn: &Connection) -> ItemService<SqliteListItemRepository<'_>> {
    ItemService::new(SqliteListItemRepository::try_new(conn).unwrap())
}
