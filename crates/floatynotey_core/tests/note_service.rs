use floatynotey_core::db::open_db_in_memory;
use floatynotey_core::{
    ManualClock, Node, NoteChanges, NoteService, SqliteNoteStore, StoreError, UNTITLED,
};
use std::sync::Arc;
use std::time::Duration;

fn service_at(
    conn: &rusqlite::Connection,
    start_ms: i64,
) -> (NoteService<SqliteNoteStore<'_>>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_ms));
    let store = SqliteNoteStore::try_new(conn).unwrap();
    (NoteService::with_clock(store, clock.clone()), clock)
}

#[test]
fn create_note_defaults_to_untitled_unpinned_empty_document() {
    let conn = open_db_in_memory().unwrap();
    let (service, _clock) = service_at(&conn, 1_700_000_000_000);

    let id = service.create_note(None).unwrap();
    let note = service.get_note(id).unwrap().unwrap();

    assert_eq!(note.title(), UNTITLED);
    assert!(!note.pinned);
    assert_eq!(note.created, note.modified);
    assert_eq!(note.created, 1_700_000_000_000);
    assert_eq!(note.content, Node::empty_document());
}

#[test]
fn update_note_bumps_modified_and_keeps_created() {
    let conn = open_db_in_memory().unwrap();
    let (service, clock) = service_at(&conn, 1_000);
    let id = service.create_note(None).unwrap();

    clock.advance(Duration::from_millis(250));
    service
        .update_note(id, NoteChanges::content(Node::plain_document("Groceries")))
        .unwrap();

    let note = service.get_note(id).unwrap().unwrap();
    assert_eq!(note.created, 1_000);
    assert_eq!(note.modified, 1_250);
    assert_eq!(note.title(), "Groceries");

    clock.advance(Duration::from_millis(1));
    service.update_note(id, NoteChanges::default()).unwrap();
    assert_eq!(service.get_note(id).unwrap().unwrap().modified, 1_251);
}

#[test]
fn update_and_delete_of_missing_note_fail_with_not_found() {
    let conn = open_db_in_memory().unwrap();
    let (service, _clock) = service_at(&conn, 1);

    assert!(matches!(
        service.update_note(5, NoteChanges::pinned(true)),
        Err(StoreError::NotFound(5))
    ));
    assert!(matches!(service.delete_note(5), Err(StoreError::NotFound(5))));
}

#[test]
fn list_notes_puts_pinned_first_then_newest() {
    let conn = open_db_in_memory().unwrap();
    let (service, clock) = service_at(&conn, 100);

    // B is the oldest but pinned.
    let b = service.create_note(Some(Node::plain_document("B"))).unwrap();
    service.update_note(b, NoteChanges::pinned(true)).unwrap();

    clock.set(200);
    let a = service.create_note(Some(Node::plain_document("A"))).unwrap();

    clock.set(300);
    let c = service.create_note(Some(Node::plain_document("C"))).unwrap();

    let order: Vec<_> = service
        .list_notes()
        .unwrap()
        .into_iter()
        .map(|note| note.id)
        .collect();
    assert_eq!(order, vec![b, c, a]);
}

#[test]
fn search_matches_titles_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let (service, clock) = service_at(&conn, 1);

    for title in ["Shopping list", "Work", "shopping for gifts"] {
        clock.advance(Duration::from_millis(10));
        service
            .create_note(Some(Node::plain_document(title)))
            .unwrap();
    }
    // Body text is not searched, only the title line.
    service
        .create_note(Some(Node::doc(vec![
            Node::paragraph(vec![Node::text("Ideas")]),
            Node::paragraph(vec![Node::text("shopping mall")]),
        ])))
        .unwrap();

    let titles: Vec<_> = service
        .search_notes("shopping")
        .unwrap()
        .into_iter()
        .map(|note| note.title())
        .collect();
    assert_eq!(titles, vec!["shopping for gifts", "Shopping list"]);

    assert!(service.search_notes("xyz").unwrap().is_empty());
    assert_eq!(service.search_notes("").unwrap().len(), 4);
}

#[test]
fn delete_removes_note_and_updates_count() {
    let conn = open_db_in_memory().unwrap();
    let (service, _clock) = service_at(&conn, 1);

    let first = service.create_note(None).unwrap();
    service.create_note(None).unwrap();
    assert_eq!(service.note_count().unwrap(), 2);

    service.delete_note(first).unwrap();
    assert_eq!(service.note_count().unwrap(), 1);
    assert_eq!(service.get_note(first).unwrap(), None);
}
