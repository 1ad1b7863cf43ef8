//! Create Tests
//!
//! Validation gate, compact expansion and per-tier persistence.

use crate::common::*;

// ============================================================================
// Validation gate
// ============================================================================

#[test]
fn invalid_document_id_fails_before_any_store_call() {
    let t = TestEngine::new();
    for scope in [StorageScope::Record, StorageScope::Batch] {
        let err = t
            .engine
            .create_annotations(
                "not-an-id",
                batch(json!({"data": [{"@context": "t"}]})),
                BatchFormat::Basic,
                scope,
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier(_)));
    }
    assert_eq!(t.store_calls(), 0);
}

#[test]
fn scope_all_is_unsupported_for_every_format() {
    let t = TestEngine::new();
    for format in [BatchFormat::Basic, BatchFormat::Compact] {
        let err = t
            .engine
            .create_annotations(
                &new_doc_id(),
                batch(json!({"common": {"@context": "t"}, "data": [{"a": 1}]})),
                format,
                StorageScope::All,
            )
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedStorageScope(_)));
    }
    assert_eq!(t.store_calls(), 0);
}

#[test]
fn missing_context_persists_nothing() {
    let t = TestEngine::new();
    let id = new_doc_id();
    for scope in [StorageScope::Record, StorageScope::Batch] {
        let err = t
            .engine
            .create_annotations(
                &id,
                batch(json!({"data": [{"a": 1, "@context": "t"}, {"b": 2}]})),
                BatchFormat::Basic,
                scope,
            )
            .unwrap_err();
        match err {
            Error::MissingRequiredField { index, document_id } => {
                assert_eq!(index, 1);
                assert_eq!(document_id, id);
            }
            other => panic!("Wrong error variant: {other:?}"),
        }
    }
    assert_eq!(t.store_calls(), 0);
    assert!(t.get_all(&id, StorageScope::All).is_empty());
}

#[test]
fn compact_common_can_supply_context() {
    let t = TestEngine::new();
    let id = new_doc_id();
    let created = t.create(
        &id,
        json!({"common": {"@context": "test"}, "data": [{"a": 1}, {"b": 2}]}),
        BatchFormat::Compact,
        StorageScope::Record,
    );
    assert_eq!(created, 2);
}

#[test]
fn common_is_ignored_in_basic_format() {
    let t = TestEngine::new();
    let err = t
        .engine
        .create_annotations(
            &new_doc_id(),
            batch(json!({"common": {"@context": "test"}, "data": [{"a": 1}]})),
            BatchFormat::Basic,
            StorageScope::Record,
        )
        .unwrap_err();
    assert!(matches!(err, Error::MissingRequiredField { index: 0, .. }));
}

#[test]
fn absent_or_empty_data_is_a_no_op() {
    let t = TestEngine::new();
    let id = new_doc_id();
    for input in [json!({}), json!({"data": []}), json!({"common": {"@context": "t"}})] {
        assert_eq!(t.create(&id, input, BatchFormat::Compact, StorageScope::Batch), 0);
    }
    assert_eq!(t.store_calls(), 0);
}

#[test]
fn unconfigured_tier_is_rejected() {
    let t = TestEngine::with_collections(StorageCollections::new().with_batch(BATCHES));
    let err = t
        .engine
        .create_annotations(
            &new_doc_id(),
            batch(json!({"data": [{"@context": "t"}]})),
            BatchFormat::Basic,
            StorageScope::Record,
        )
        .unwrap_err();
    assert!(matches!(err, Error::StorageNotConfigured(StorageScope::Record)));
    assert_eq!(t.store_calls(), 0);
}

// ============================================================================
// Record tier
// ============================================================================

#[test]
fn compact_common_overwrites_element_values() {
    let t = TestEngine::new();
    let id = new_doc_id();
    t.create(
        &id,
        json!({
            "common": {"@context": "test", "source": "model", "k": 1},
            "data": [{"a": 1, "source": "human"}, {"b": 2, "k": 7}, {"c": 3}]
        }),
        BatchFormat::Compact,
        StorageScope::Record,
    );

    let set = t.get_all(&id, StorageScope::Record);
    assert_eq!(set.len(), 3);
    for element in &set.data {
        assert_eq!(element["@context"], json!("test"));
        assert_eq!(element["source"], json!("model"));
        assert_eq!(element["k"], json!(1));
    }
}

#[test]
fn record_create_sets_parent_and_store_ids() {
    let t = TestEngine::new();
    let id = new_doc_id();
    t.create(
        &id,
        json!({"data": [{"@context": "t", "id": "client-chosen"}]}),
        BatchFormat::Basic,
        StorageScope::Record,
    );

    let set = t.get_all(&id, StorageScope::Record);
    let element = &set.data[0];
    assert_eq!(element["doc_id"], json!(id));
    let public = element["id"].as_str().unwrap();
    assert_ne!(public, "client-chosen");
    assert!(annostore::is_valid_id(public));
}

#[test]
fn record_insert_count_mismatch_is_surfaced() {
    let t = TestEngine::new();
    t.docs.set_insert_fault(RECORDS, InsertFault::Truncate(2));
    let err = t
        .engine
        .create_annotations(
            &new_doc_id(),
            batch(json!({"common": {"@context": "t"}, "data": [{"a": 1}, {"a": 2}, {"a": 3}]})),
            BatchFormat::Compact,
            StorageScope::Record,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InsertCountMismatch {
            inserted: 2,
            expected: 3
        }
    ));
}

// ============================================================================
// Batch tier
// ============================================================================

#[test]
fn batch_create_writes_one_blob_and_one_record() {
    let t = TestEngine::new();
    let id = new_doc_id();
    let created = t.create(
        &id,
        json!({"common": {"@context": "test"}, "data": [{"a": 1}, {"a": 2}, {"a": 3}]}),
        BatchFormat::Compact,
        StorageScope::Batch,
    );
    assert_eq!(created, 3);
    assert_eq!(t.batch_records(), 1);
    assert_eq!(t.blob_count(), 1);
    assert_eq!(t.docs.inner().count(RECORDS), 0);
}

#[test]
fn batch_reload_returns_submitted_elements() {
    let t = TestEngine::new();
    let id = new_doc_id();
    let data = json!([
        {"@context": "t", "start": 0, "end": 4, "label": "PER"},
        {"@context": "t", "start": 9, "end": 12, "label": "LOC"},
        {"@context": "t", "start": 20, "end": 22, "label": "PER", "nested": {"score": 0.5}}
    ]);
    t.create(&id, json!({"data": data.clone()}), BatchFormat::Basic, StorageScope::Batch);

    let set = t.get_all(&id, StorageScope::Batch);
    assert_eq!(set.len(), 3);
    for (returned, submitted) in set.data.iter().zip(data.as_array().unwrap()) {
        let mut returned = returned.as_object().unwrap().clone();
        returned.remove("id");
        returned.remove("doc_id");
        assert_eq!(&Value::Object(returned), submitted);
    }
}

#[test]
fn batch_elements_get_distinct_local_ids() {
    let t = TestEngine::new();
    let id = new_doc_id();
    t.create(
        &id,
        json!({"common": {"@context": "t"}, "data": [{"a": 1}, {"a": 1}, {"a": 1}]}),
        BatchFormat::Compact,
        StorageScope::Batch,
    );
    let set = t.get_all(&id, StorageScope::Batch);
    let mut ids: Vec<&str> = set.data.iter().map(|e| e["id"].as_str().unwrap()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}

#[test]
fn batch_create_works_with_filesystem_blobs() {
    let t = FsTestEngine::new();
    let id = new_doc_id();
    t.engine
        .create_annotations(
            &id,
            batch(json!({"common": {"@context": "t"}, "data": [{"a": 1}, {"a": 2}]})),
            BatchFormat::Compact,
            StorageScope::Batch,
        )
        .unwrap();

    assert_eq!(t.blobs.handles().unwrap().len(), 1);
    assert!(t.root().join("blobs").join("annotations").is_dir());
    let set = t
        .engine
        .get_annotations(&[&id], &Selector::new(), BatchFormat::Basic, StorageScope::Batch)
        .unwrap();
    assert_eq!(set.len(), 2);
}
