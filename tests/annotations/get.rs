//! Get Tests
//!
//! Scoping by document, selector semantics per tier, and output formats.

use crate::common::*;

fn two_batches(t: &TestEngine, id: &str) {
    t.create(
        id,
        json!({"common": {"@context": "test", "k": 1}, "data": [{"a": 1}, {"a": 2}, {"a": 3}]}),
        BatchFormat::Compact,
        StorageScope::Batch,
    );
    t.create(
        id,
        json!({"common": {"@context": "test", "k": 2}, "data": [{"a": 4}, {"a": 5}]}),
        BatchFormat::Compact,
        StorageScope::Batch,
    );
}

#[test]
fn two_batches_are_read_together_and_by_common_field() {
    let t = TestEngine::new();
    let id = new_doc_id();
    two_batches(&t, &id);

    assert_eq!(t.get_all(&id, StorageScope::Batch).len(), 5);
    assert_eq!(t.get(&id, Selector::new().eq("k", 2), StorageScope::Batch).len(), 2);
    assert_eq!(t.get(&id, Selector::new().eq("k", 3), StorageScope::Batch).len(), 0);
}

#[test]
fn batch_selector_applies_to_metadata_only() {
    let t = TestEngine::new();
    let id = new_doc_id();
    two_batches(&t, &id);

    // "a" differs per element, so it never reaches the metadata record
    assert_eq!(t.get(&id, Selector::new().eq("a", 4), StorageScope::Batch).len(), 0);

    // a matching batch contributes every one of its elements
    let set = t.get(
        &id,
        Selector::new().with("k", json!({"$gte": 2})),
        StorageScope::Batch,
    );
    assert_eq!(set.len(), 2);
}

#[test]
fn record_selector_applies_per_element() {
    let t = TestEngine::new();
    let id = new_doc_id();
    t.create(
        &id,
        json!({"common": {"@context": "t"}, "data": [{"score": 1}, {"score": 5}, {"score": 9}]}),
        BatchFormat::Compact,
        StorageScope::Record,
    );

    let mid = Selector::new().with("score", json!({"$gt": 1, "$lt": 9}));
    assert_eq!(t.get(&id, mid, StorageScope::Record).len(), 1);
    let either = Selector::new().with("score", json!({"$in": [1, 9]}));
    assert_eq!(t.get(&id, either, StorageScope::Record).len(), 2);
}

#[test]
fn scope_all_reads_both_tiers() {
    let t = TestEngine::new();
    let id = new_doc_id();
    t.create(
        &id,
        json!({"common": {"@context": "t"}, "data": [{"a": 1}]}),
        BatchFormat::Compact,
        StorageScope::Record,
    );
    two_batches(&t, &id);

    assert_eq!(t.get_all(&id, StorageScope::Record).len(), 1);
    assert_eq!(t.get_all(&id, StorageScope::All).len(), 6);
}

#[test]
fn results_are_scoped_to_requested_documents() {
    let t = TestEngine::new();
    let mine = new_doc_id();
    let other = new_doc_id();
    two_batches(&t, &mine);
    two_batches(&t, &other);

    assert_eq!(t.get_all(&mine, StorageScope::Batch).len(), 5);

    let both = t
        .engine
        .get_annotations(
            &[&mine, &other],
            &Selector::new(),
            BatchFormat::Basic,
            StorageScope::Batch,
        )
        .unwrap();
    assert_eq!(both.len(), 10);
}

#[test]
fn reserved_selector_fields_are_ignored() {
    let t = TestEngine::new();
    let mine = new_doc_id();
    let other = new_doc_id();
    two_batches(&t, &other);

    let sneaky = Selector::new()
        .eq("doc_id", other.clone())
        .with("file_fs_id_batch", json!({"$exists": true}));
    assert!(t.get(&mine, sneaky, StorageScope::Batch).is_empty());
}

#[test]
fn empty_or_invalid_ids_return_empty_data() {
    let t = TestEngine::new();
    two_batches(&t, &new_doc_id());
    let calls_before = t.store_calls();

    let none: [&str; 0] = [];
    let empty = t
        .engine
        .get_annotations(&none, &Selector::new(), BatchFormat::Basic, StorageScope::All)
        .unwrap();
    assert!(empty.is_empty());

    let invalid = t
        .engine
        .get_annotations(&["yolo"], &Selector::new(), BatchFormat::Basic, StorageScope::All)
        .unwrap();
    assert!(invalid.is_empty());
    assert_eq!(t.store_calls(), calls_before);
}

#[test]
fn missing_blob_is_skipped() {
    let t = TestEngine::new();
    let id = new_doc_id();
    two_batches(&t, &id);

    let second = t
        .docs
        .inner()
        .find_one(BATCHES, &Selector::new().eq("k", 2))
        .unwrap()
        .unwrap();
    let handle: BlobHandle = second["file_fs_id_batch"].as_str().unwrap().parse().unwrap();
    t.blobs.inner().delete(&handle).unwrap();

    let set = t.get_all(&id, StorageScope::Batch);
    assert_eq!(set.len(), 3);
    assert!(set.data.iter().all(|e| e["k"] == json!(1)));
}

#[test]
fn compact_output_factors_common_fields() {
    let t = TestEngine::new();
    let id = new_doc_id();
    t.create(
        &id,
        json!({"common": {"@context": "test", "k": 1}, "data": [{"a": 1}, {"a": 2}]}),
        BatchFormat::Compact,
        StorageScope::Batch,
    );

    let set = t
        .engine
        .get_annotations(&[&id], &Selector::new(), BatchFormat::Compact, StorageScope::Batch)
        .unwrap();
    let common = set.common.as_ref().expect("compact output carries common fields");
    assert_eq!(common["@context"], json!("test"));
    assert_eq!(common["k"], json!(1));
    assert_eq!(common["doc_id"], json!(id));
    assert_eq!(set.data.len(), 2);
    for residual in &set.data {
        assert!(residual.get("a").is_some());
        assert!(residual.get("id").is_some());
        assert!(residual.get("k").is_none());
    }

    let wire = serde_json::to_value(&set).unwrap();
    assert!(wire.get("common").is_some());
    let basic = serde_json::to_value(t.get_all(&id, StorageScope::Batch)).unwrap();
    assert!(basic.get("common").is_none());
}

#[test]
fn compact_output_of_one_element_keeps_its_id() {
    let t = TestEngine::new();
    let id = new_doc_id();
    t.create(
        &id,
        json!({"common": {"@context": "test"}, "data": [{"a": 1}]}),
        BatchFormat::Compact,
        StorageScope::Batch,
    );

    let set = t
        .engine
        .get_annotations(&[&id], &Selector::new(), BatchFormat::Compact, StorageScope::Batch)
        .unwrap();
    let common = set.common.as_ref().expect("compact output carries common fields");
    assert!(common.get("id").is_none());
    assert_eq!(common["a"], json!(1));
    assert_eq!(set.data.len(), 1);
    assert!(set.data[0]["id"].as_str().is_some_and(|s| s.len() == 24));
}

#[test]
fn unknown_selector_operator_is_rejected() {
    let t = TestEngine::new();
    let err = t
        .engine
        .get_annotations(
            &[new_doc_id()],
            &Selector::new().with("a", json!({"$where": "1"})),
            BatchFormat::Basic,
            StorageScope::All,
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSelector(_)));
}

#[test]
fn disconnected_store_reports_not_connected() {
    let t = TestEngine::new();
    t.engine.disconnect();
    let err = t
        .engine
        .get_annotations(
            &[new_doc_id()],
            &Selector::new(),
            BatchFormat::Basic,
            StorageScope::Record,
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotConnected));
}
