//! Session store and reference-memory integration tests

use chrono::Duration;
use orchestra::services::Service;
use orchestra::session::{resolve_reference, RefKind, SessionStore};
use serde_json::{json, Map};

#[test]
fn test_store_lifecycle() {
    let mut store = SessionStore::new();
    assert!(store.is_empty());

    let session = store.create("alice");
    session.add_command(
        "find the budget email",
        Service::Mail,
        "search_email",
        Map::new(),
        Some(json!([{"id": "m1", "subject": "Budget"}])),
        true,
        None,
    );

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("alice").unwrap().history().len(), 1);
    assert!(store.get("bob").is_none());

    let ended = store.end("alice").unwrap();
    assert_eq!(ended.history().len(), 1);
    assert!(store.is_empty());
}

#[test]
fn test_create_replaces_existing_session() {
    let mut store = SessionStore::new();
    store.create("alice").add_command(
        "anything",
        Service::Mail,
        "search_email",
        Map::new(),
        None,
        true,
        None,
    );
    // Re-authentication starts fresh
    let fresh = store.create("alice");
    assert!(fresh.history().is_empty());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_create_anonymous_generates_distinct_keys() {
    let mut store = SessionStore::new();
    let a = store.create_anonymous();
    let b = store.create_anonymous();
    assert_ne!(a, b);
    assert_eq!(store.len(), 2);
    assert!(store.get(&a).is_some());
}

#[test]
fn test_evict_idle_keeps_active_sessions() {
    let mut store = SessionStore::new();
    store.create("alice");
    store.create("bob");

    let evicted = store.evict_idle(Duration::hours(1));
    assert_eq!(evicted, 0);
    assert_eq!(store.len(), 2);
}

#[test]
fn test_references_track_most_recent_result() {
    let mut store = SessionStore::new();
    let session = store.create("alice");

    session.add_command(
        "find the budget email",
        Service::Mail,
        "search_email",
        Map::new(),
        Some(json!([{"id": "m1", "subject": "Budget"}])),
        true,
        None,
    );
    session.add_command(
        "find the planning email",
        Service::Mail,
        "search_email",
        Map::new(),
        Some(json!([{"id": "m2", "subject": "Planning"}])),
        true,
        None,
    );

    let last = session.get_reference("last_email").unwrap();
    assert_eq!(last["id"], "m2");
}

#[test]
fn test_reference_resolution_across_services() {
    let mut store = SessionStore::new();
    let session = store.create("alice");

    session.add_command(
        "find the report",
        Service::Drive,
        "search_file",
        Map::new(),
        Some(json!([{"id": "f1", "name": "report.pdf"}])),
        true,
        None,
    );

    // Explicit phrase
    let (kind, value) = resolve_reference(session, "share that file with bob").unwrap();
    assert_eq!(kind, RefKind::File);
    assert_eq!(value["id"], "f1");

    // Bare pronoun picks the kind from the last command's service
    let (kind, value) = resolve_reference(session, "it").unwrap();
    assert_eq!(kind, RefKind::File);
    assert_eq!(value["id"], "f1");

    // Nothing matching a different kind
    assert!(resolve_reference(session, "reply to that email").is_none());
}

#[test]
fn test_failed_commands_do_not_update_entity_references() {
    let mut store = SessionStore::new();
    let session = store.create("alice");

    session.add_command(
        "find the budget email",
        Service::Mail,
        "search_email",
        Map::new(),
        Some(json!([{"id": "m1"}])),
        true,
        None,
    );
    session.add_command(
        "find more email",
        Service::Mail,
        "search_email",
        Map::new(),
        None,
        false,
        Some("backend unavailable".into()),
    );

    // Entity slot still points at the last successful result
    assert_eq!(session.get_reference("last_email").unwrap()["id"], "m1");
    // But the failure is in history
    assert!(!session.get_last_command().unwrap().success);
}
