//! Integration tests for lineage-store
//!
//! These tests verify name resolution, registration checks, the four
//! shaped inserts with their audit counterparts, and history chains.

use lineage_domain::traits::ProvenanceStore;
use lineage_domain::{
    ChainEntry, EntityKind, ProvenanceRecord, ResolvedIds, WriteShape, DEFAULT_VERSION,
};
use lineage_store::{ObjectLookup, SqliteStore};

fn seeded_store() -> (SqliteStore, ResolvedIds) {
    let mut store = SqliteStore::new(":memory:").unwrap();

    let event_id = store.add_event("file-upload").unwrap();
    let category_id = store.add_category("storage").unwrap();
    let service_id = store.add_service("data-gateway", DEFAULT_VERSION).unwrap();
    store.register_object("120039", "dg-obj-1").unwrap();

    (
        store,
        ResolvedIds {
            event_id,
            category_id,
            service_id,
        },
    )
}

fn record(ids: ResolvedIds) -> ProvenanceRecord {
    ProvenanceRecord {
        object_uuid: "120039".to_string(),
        ids,
        username: "svc_ingest".to_string(),
        proxy_username: None,
        event_data: None,
        source_address: "10.0.4.17".to_string(),
        created_at: 1_350_000_000,
    }
}

#[test]
fn test_store_initialization() {
    let store = SqliteStore::new(":memory:");
    assert!(store.is_ok(), "Store should initialize successfully");
}

#[test]
fn test_resolve_known_names() {
    let (store, ids) = seeded_store();

    assert_eq!(
        store
            .resolve_id(EntityKind::Event, "file-upload", DEFAULT_VERSION)
            .unwrap(),
        Some(ids.event_id)
    );
    assert_eq!(
        store
            .resolve_id(EntityKind::Category, "storage", DEFAULT_VERSION)
            .unwrap(),
        Some(ids.category_id)
    );
    assert_eq!(
        store
            .resolve_id(EntityKind::Service, "data-gateway", DEFAULT_VERSION)
            .unwrap(),
        Some(ids.service_id)
    );
}

#[test]
fn test_resolve_unknown_name() {
    let (store, _) = seeded_store();

    let id = store
        .resolve_id(EntityKind::Event, "no-such-event", DEFAULT_VERSION)
        .unwrap();
    assert_eq!(id, None);
}

#[test]
fn test_service_resolution_is_version_scoped() {
    let (mut store, _) = seeded_store();

    let v2_id = store.add_service("data-gateway", "2-0").unwrap();

    // Explicit version resolves the versioned row.
    assert_eq!(
        store
            .resolve_id(EntityKind::Service, "data-gateway", "2-0")
            .unwrap(),
        Some(v2_id)
    );

    // An unknown version does not fall back to the name-only row.
    assert_eq!(
        store
            .resolve_id(EntityKind::Service, "data-gateway", "9-9")
            .unwrap(),
        None
    );

    // Events and categories ignore the version entirely.
    assert!(store
        .resolve_id(EntityKind::Event, "file-upload", "2-0")
        .unwrap()
        .is_some());
}

#[test]
fn test_registration_count() {
    let (mut store, _) = seeded_store();

    assert_eq!(store.registration_count("120039").unwrap(), 1);
    assert_eq!(store.registration_count("999999").unwrap(), 0);

    // A duplicate registration is visible as a count of two.
    store.register_object("120039", "dg-obj-dup").unwrap();
    assert_eq!(store.registration_count("120039").unwrap(), 2);
}

#[test]
fn test_insert_each_shape() {
    let (mut store, ids) = seeded_store();

    let basic = record(ids);
    assert_eq!(store.insert_record(&basic, WriteShape::Basic).unwrap(), 1);

    let mut proxy = record(ids);
    proxy.proxy_username = Some("alice".to_string());
    assert_eq!(store.insert_record(&proxy, WriteShape::Proxy).unwrap(), 1);

    let mut data = record(ids);
    data.event_data = Some("{\"size\":42}".to_string());
    assert_eq!(store.insert_record(&data, WriteShape::Data).unwrap(), 1);

    let mut full = record(ids);
    full.proxy_username = Some("alice".to_string());
    full.event_data = Some("{\"size\":42}".to_string());
    assert_eq!(store.insert_record(&full, WriteShape::Full).unwrap(), 1);
}

#[test]
fn test_audit_insert_mirrors_shape() {
    let (mut store, ids) = seeded_store();

    let mut rec = record(ids);
    rec.proxy_username = Some("alice".to_string());
    rec.event_data = Some("payload".to_string());

    assert_eq!(store.insert_audit(&rec, WriteShape::Full).unwrap(), 1);

    // The primary table is untouched by an audit insert.
    assert_eq!(store.insert_record(&rec, WriteShape::Full).unwrap(), 1);
}

#[test]
fn test_replay_is_not_deduplicated() {
    let (mut store, ids) = seeded_store();

    let rec = record(ids);
    assert_eq!(store.insert_record(&rec, WriteShape::Basic).unwrap(), 1);
    assert_eq!(store.insert_record(&rec, WriteShape::Basic).unwrap(), 1);
    // Two identical requests produce two distinct persisted records.
}

#[test]
fn test_chain_membership_and_inserts() {
    let (mut store, ids) = seeded_store();

    assert_eq!(store.chain_members("chain-1").unwrap(), 0);

    let parent = ChainEntry {
        chain_code: "chain-1".to_string(),
        object_uuid: "120039".to_string(),
        ids,
        username: "svc_ingest".to_string(),
        created_at: 1_350_000_000,
        is_parent: true,
    };
    assert_eq!(store.insert_chain_entry(&parent).unwrap(), 1);
    assert_eq!(store.chain_members("chain-1").unwrap(), 1);

    let child = ChainEntry {
        is_parent: false,
        created_at: 1_350_000_100,
        ..parent
    };
    assert_eq!(store.insert_chain_entry(&child).unwrap(), 1);
    assert_eq!(store.chain_members("chain-1").unwrap(), 2);

    // Other codes are unaffected.
    assert_eq!(store.chain_members("chain-2").unwrap(), 0);
}

#[test]
fn test_object_lookup() {
    let (mut store, _) = seeded_store();

    assert_eq!(
        store.lookup_object("dg-obj-1").unwrap(),
        ObjectLookup::Found("120039".to_string())
    );
    assert_eq!(store.lookup_object("missing").unwrap(), ObjectLookup::Missing);

    store.register_object("120040", "dg-obj-1").unwrap();
    assert_eq!(
        store.lookup_object("dg-obj-1").unwrap(),
        ObjectLookup::Ambiguous(2)
    );
}

#[test]
fn test_persistence_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lineage.db");

    let ids = {
        let mut store = SqliteStore::new(&path).unwrap();
        let event_id = store.add_event("file-upload").unwrap();
        let category_id = store.add_category("storage").unwrap();
        let service_id = store.add_service("data-gateway", DEFAULT_VERSION).unwrap();
        store.register_object("120039", "dg-obj-1").unwrap();

        let ids = ResolvedIds {
            event_id,
            category_id,
            service_id,
        };
        let mut rec = record(ids);
        rec.event_data = Some("kept".to_string());
        assert_eq!(store.insert_record(&rec, WriteShape::Data).unwrap(), 1);
        ids
    };

    let store = SqliteStore::new(&path).unwrap();
    assert_eq!(store.registration_count("120039").unwrap(), 1);
    assert_eq!(
        store
            .resolve_id(EntityKind::Event, "file-upload", DEFAULT_VERSION)
            .unwrap(),
        Some(ids.event_id)
    );
}
