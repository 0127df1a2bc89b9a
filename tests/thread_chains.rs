//! Thread reconstruction over realistic reply chains, including corrupted
//! parent pointers that only a dataset on disk can carry.

use mailstore::service::resolve_thread_page;
use mailstore::threading::resolve_thread;
use mailstore::{MessageStore, NewMessage, StoreConfig};
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use uuid::Uuid;

fn temp_store() -> (tempfile::TempDir, MessageStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = MessageStore::new(StoreConfig::with_data_dir(dir.path()));
    store.admit().unwrap();
    (dir, store)
}

fn send(store: &MessageStore, subject: &str, parent_id: Option<Uuid>) -> Uuid {
    let draft = NewMessage::new(&["alice", "bob"], "carol", subject, "body", parent_id).unwrap();
    store.create(draft.into_message()).unwrap().id
}

fn record(id: &str, parent: Option<&str>, timestamp: &str) -> Value {
    json!({
        "id": id,
        "to": ["alice"],
        "from": "bob",
        "subject": "s",
        "content": "c",
        "timestamp": timestamp,
        "isResponseTo": parent,
        "readBy": [],
        "deletedBy": [],
    })
}

fn write_dataset(dir: &Path, records: Vec<Value>) {
    let doc = json!({"version": 1, "messages": records});
    fs::write(
        dir.join("messages.json"),
        serde_json::to_string_pretty(&doc).unwrap(),
    )
    .unwrap();
}

#[test]
fn chain_of_four_resolves_from_every_member() {
    let (_dir, store) = temp_store();
    let a = send(&store, "start", None);
    let b = send(&store, "reply 1", Some(a));
    let c = send(&store, "reply 2", Some(b));
    let d = send(&store, "reply 3", Some(c));

    for requested in [a, b, c, d] {
        let thread = resolve_thread(&store, requested).unwrap();
        assert_eq!(thread.root.id, a, "root must be the first message");
        assert_eq!(thread.members.len(), 3);
        assert!(thread.members.iter().all(|m| m.id != requested));
    }
}

#[test]
fn deep_chain_terminates() {
    let (_dir, store) = temp_store();
    let root = send(&store, "root", None);
    let mut parent = root;
    for i in 0..60 {
        parent = send(&store, &format!("reply {i}"), Some(parent));
    }

    let thread = resolve_thread(&store, parent).unwrap();
    assert_eq!(thread.root.id, root);
    assert_eq!(thread.members.len(), 60);
}

#[test]
fn injected_cycle_terminates_with_finite_result() {
    let dir = tempfile::tempdir().unwrap();
    let a = "550e8400-e29b-41d4-a716-446655440000";
    let b = "650e8400-e29b-41d4-a716-446655440001";
    let c = "750e8400-e29b-41d4-a716-446655440002";
    // a → b → c → a: impossible through the write path, possible on disk.
    write_dataset(
        dir.path(),
        vec![
            record(a, Some(c), "2024-01-01T10:00:00Z"),
            record(b, Some(a), "2024-01-01T11:00:00Z"),
            record(c, Some(b), "2024-01-01T12:00:00Z"),
        ],
    );

    let store = MessageStore::new(StoreConfig::with_data_dir(dir.path()));
    store.admit().unwrap();

    for id in [a, b, c] {
        let thread = resolve_thread(&store, Uuid::parse_str(id).unwrap()).unwrap();
        assert_eq!(thread.members.len(), 2);
    }
}

#[test]
fn dangling_parent_becomes_effective_root() {
    let dir = tempfile::tempdir().unwrap();
    let a = "550e8400-e29b-41d4-a716-446655440000";
    let b = "650e8400-e29b-41d4-a716-446655440001";
    let missing = "999e8400-e29b-41d4-a716-446655449999";
    write_dataset(
        dir.path(),
        vec![
            record(a, Some(missing), "2024-01-01T10:00:00Z"),
            record(b, Some(a), "2024-01-01T11:00:00Z"),
        ],
    );

    let store = MessageStore::new(StoreConfig::with_data_dir(dir.path()));
    store.admit().unwrap();

    let thread = resolve_thread(&store, Uuid::parse_str(b).unwrap()).unwrap();
    assert_eq!(thread.root.id, Uuid::parse_str(a).unwrap());
    // The dangling pointer survives resolution unrepaired.
    assert_eq!(thread.root.parent_id, Some(Uuid::parse_str(missing).unwrap()));
}

#[test]
fn members_are_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let a = "550e8400-e29b-41d4-a716-446655440000";
    let b = "650e8400-e29b-41d4-a716-446655440001";
    let c = "750e8400-e29b-41d4-a716-446655440002";
    write_dataset(
        dir.path(),
        vec![
            record(a, None, "2024-01-01T10:00:00Z"),
            record(b, Some(a), "2024-01-03T10:00:00Z"),
            record(c, Some(a), "2024-01-02T10:00:00Z"),
        ],
    );

    let store = MessageStore::new(StoreConfig::with_data_dir(dir.path()));
    store.admit().unwrap();

    let thread = resolve_thread(&store, Uuid::parse_str(a).unwrap()).unwrap();
    let order: Vec<Uuid> = thread.members.iter().map(|m| m.id).collect();
    assert_eq!(
        order,
        vec![Uuid::parse_str(b).unwrap(), Uuid::parse_str(c).unwrap()]
    );
}

#[test]
fn thread_paging_covers_all_members() {
    let (_dir, store) = temp_store();
    let root = send(&store, "root", None);
    for i in 0..25 {
        send(&store, &format!("reply {i}"), Some(root));
    }

    let (resolved_root, first) = resolve_thread_page(&store, root, 1, 20).unwrap().unwrap();
    assert_eq!(resolved_root.id, root);
    assert_eq!(first.data.len(), 20);
    assert_eq!(first.pagination.total_items, 25);
    assert!(first.pagination.has_next);

    let (_, second) = resolve_thread_page(&store, root, 2, 20).unwrap().unwrap();
    assert_eq!(second.data.len(), 5);
    assert!(!second.pagination.has_next);
}
