//! Replace Tests
//!
//! `replace_batch` and the single-annotation record operations.

use crate::common::*;

#[test]
fn replace_swaps_only_batches_with_matching_common() {
    let t = TestEngine::new();
    let id = new_doc_id();
    t.create(
        &id,
        json!({"common": {"@context": "test", "k": 1}, "data": [{"a": 1}, {"a": 2}, {"a": 3}]}),
        BatchFormat::Compact,
        StorageScope::Batch,
    );
    t.create(
        &id,
        json!({"common": {"@context": "test", "k": 2}, "data": [{"a": 4}, {"a": 5}]}),
        BatchFormat::Compact,
        StorageScope::Batch,
    );

    let created = t
        .engine
        .replace_batch(
            &id,
            batch(json!({"common": {"@context": "test", "k": 2}, "data": [{"a": 6}]})),
            BatchFormat::Compact,
        )
        .unwrap();
    assert_eq!(created, 1);

    assert_eq!(t.get_all(&id, StorageScope::Batch).len(), 4);
    let replaced = t.get(&id, Selector::new().eq("k", 2), StorageScope::Batch);
    assert_eq!(replaced.len(), 1);
    assert_eq!(replaced.data[0]["a"], json!(6));
    assert_eq!(t.blob_count(), 2);
}

#[test]
fn replace_without_common_replaces_every_batch() {
    let t = TestEngine::new();
    let id = new_doc_id();
    for k in [1, 2] {
        t.create(
            &id,
            json!({"common": {"@context": "t", "k": k}, "data": [{"a": 1}]}),
            BatchFormat::Compact,
            StorageScope::Batch,
        );
    }

    t.engine
        .replace_batch(
            &id,
            batch(json!({"data": [{"@context": "t", "a": 9}, {"@context": "t", "a": 10}]})),
            BatchFormat::Basic,
        )
        .unwrap();

    assert_eq!(t.batch_records(), 1);
    assert_eq!(t.get_all(&id, StorageScope::Batch).len(), 2);
}

#[test]
fn invalid_replacement_leaves_existing_batches() {
    let t = TestEngine::new();
    let id = new_doc_id();
    t.create(
        &id,
        json!({"common": {"@context": "t"}, "data": [{"a": 1}]}),
        BatchFormat::Compact,
        StorageScope::Batch,
    );

    let err = t
        .engine
        .replace_batch(&id, batch(json!({"data": [{"a": 2}]})), BatchFormat::Basic)
        .unwrap_err();
    assert!(matches!(err, Error::MissingRequiredField { .. }));
    assert_eq!(t.get_all(&id, StorageScope::Batch).len(), 1);
}

#[test]
fn replace_rejects_invalid_document_id() {
    let t = TestEngine::new();
    let err = t
        .engine
        .replace_batch("nope", batch(json!({"data": []})), BatchFormat::Basic)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidIdentifier(_)));
    assert_eq!(t.store_calls(), 0);
}

// ============================================================================
// Single annotations
// ============================================================================

#[test]
fn single_annotation_crud() {
    let t = TestEngine::new();
    let id = new_doc_id();

    let annotation_id = t
        .engine
        .create_annotation(&id, json!({"@context": "t", "label": "PER", "id": "ignored"}))
        .unwrap()
        .to_hex();

    let found = t.engine.get_annotation(&annotation_id).unwrap().unwrap();
    assert_eq!(found["label"], json!("PER"));
    assert_eq!(found["doc_id"], json!(id));
    assert_eq!(found["id"], json!(annotation_id));

    // visible through the batch-level read as well
    assert_eq!(t.get_all(&id, StorageScope::Record).len(), 1);

    t.engine
        .update_annotation(&annotation_id, &id, json!({"@context": "t", "label": "LOC"}))
        .unwrap();
    let updated = t.engine.get_annotation(&annotation_id).unwrap().unwrap();
    assert_eq!(updated["label"], json!("LOC"));

    assert_eq!(t.engine.delete_annotation(&annotation_id).unwrap(), 1);
    assert!(t.engine.get_annotation(&annotation_id).unwrap().is_none());
}

#[test]
fn update_unknown_annotation_is_not_found() {
    let t = TestEngine::new();
    let err = t
        .engine
        .update_annotation(&new_doc_id(), &new_doc_id(), json!({"@context": "t"}))
        .unwrap_err();
    assert!(matches!(err, Error::AnnotationNotFound(_)));
}
