//! Blob Saga Tests
//!
//! The batch create writes a blob, then a metadata record. A failed
//! metadata write must remove the blob again.

use annostore::{BatchTierStore, BlobSaga};

use crate::common::*;

#[test]
fn metadata_failure_deletes_staged_blob() {
    let t = TestEngine::new();
    t.docs.set_insert_fault(BATCHES, InsertFault::Fail);

    let err = t
        .engine
        .create_annotations(
            &new_doc_id(),
            batch(json!({"common": {"@context": "t"}, "data": [{"a": 1}, {"a": 2}]})),
            BatchFormat::Compact,
            StorageScope::Batch,
        )
        .unwrap_err();

    assert!(matches!(err, Error::BackendFailure(_)));
    let calls = t.blobs.calls();
    assert_eq!(calls.put, 1);
    assert_eq!(calls.delete, 1);
    assert_eq!(t.blob_count(), 0);
    assert_eq!(t.batch_records(), 0);
}

#[test]
fn disconnected_store_writes_no_blob() {
    let t = TestEngine::new();
    t.engine.disconnect();

    let err = t
        .engine
        .create_annotations(
            &new_doc_id(),
            batch(json!({"common": {"@context": "t"}, "data": [{"a": 1}]})),
            BatchFormat::Compact,
            StorageScope::Batch,
        )
        .unwrap_err();

    assert!(matches!(err, Error::NotConnected));
    let calls = t.blobs.calls();
    assert_eq!(calls.put, 0);
    assert_eq!(calls.delete, 0);
    assert_eq!(t.blob_count(), 0);
}

#[test]
fn blob_write_failure_writes_no_metadata() {
    let t = TestEngine::new();
    t.blobs.set_fail_puts(true);

    let err = t
        .engine
        .create_annotations(
            &new_doc_id(),
            batch(json!({"common": {"@context": "t"}, "data": [{"a": 1}]})),
            BatchFormat::Compact,
            StorageScope::Batch,
        )
        .unwrap_err();

    assert!(matches!(err, Error::BackendFailure(_)));
    assert_eq!(t.docs.calls().insert, 0);
    assert_eq!(t.batch_records(), 0);
}

#[test]
fn engine_recovers_after_fault_is_cleared() {
    let t = TestEngine::new();
    let id = new_doc_id();
    let input = json!({"common": {"@context": "t"}, "data": [{"a": 1}]});

    t.docs.set_insert_fault(BATCHES, InsertFault::Fail);
    assert!(t
        .engine
        .create_annotations(&id, batch(input.clone()), BatchFormat::Compact, StorageScope::Batch)
        .is_err());

    t.docs.clear_faults();
    assert_eq!(t.create(&id, input, BatchFormat::Compact, StorageScope::Batch), 1);
    assert_eq!(t.get_all(&id, StorageScope::Batch).len(), 1);
    assert_eq!(t.blob_count(), 1);
}

#[test]
fn compensation_runs_standalone_on_filesystem_store() {
    let t = FsTestEngine::new();
    let tier = BatchTierStore::new(
        std::sync::Arc::new(InMemoryDocumentStore::connected()),
        t.blobs.clone(),
        BATCHES,
    );

    let saga = BlobSaga::begin(&tier, b"[]").unwrap();
    let handle = saga.handle();
    assert!(t.blobs.exists(&handle).unwrap());

    saga.compensate().unwrap();
    assert!(!t.blobs.exists(&handle).unwrap());
    assert!(t.blobs.handles().unwrap().is_empty());
}
