//! Orphaned Blob Sweep Tests

use crate::common::*;

#[test]
fn clean_store_has_no_orphans() {
    let t = TestEngine::new();
    let id = new_doc_id();
    t.create(
        &id,
        json!({"common": {"@context": "t"}, "data": [{"a": 1}]}),
        BatchFormat::Compact,
        StorageScope::Batch,
    );
    assert!(t.engine.find_orphaned_blobs().unwrap().is_empty());
    assert_eq!(t.engine.sweep_orphaned_blobs().unwrap(), 0);
    assert_eq!(t.blob_count(), 1);
}

#[test]
fn crash_window_blob_is_swept() {
    let t = TestEngine::new();
    let id = new_doc_id();
    t.create(
        &id,
        json!({"common": {"@context": "t"}, "data": [{"a": 1}]}),
        BatchFormat::Compact,
        StorageScope::Batch,
    );

    // a blob written without its metadata record, as after a crash
    let orphan = t.blobs.put(br#"[{"@context":"t"}]"#).unwrap();

    assert_eq!(t.engine.find_orphaned_blobs().unwrap(), vec![orphan]);
    assert_eq!(t.engine.sweep_orphaned_blobs().unwrap(), 1);
    assert!(!t.blobs.exists(&orphan).unwrap());
    assert_eq!(t.get_all(&id, StorageScope::Batch).len(), 1);
}

#[test]
fn sweep_on_filesystem_store() {
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
    t.blobs.put(b"[]").unwrap();
    t.blobs.put(b"[]").unwrap();

    assert_eq!(t.engine.sweep_orphaned_blobs().unwrap(), 2);
    assert_eq!(t.blobs.handles().unwrap().len(), 1);
}

#[test]
fn sweep_requires_batch_tier() {
    let t = TestEngine::with_collections(StorageCollections::new().with_record(RECORDS));
    assert!(matches!(
        t.engine.find_orphaned_blobs(),
        Err(Error::StorageNotConfigured(StorageScope::Batch))
    ));
}
