//! Instrumented store wrappers
//!
//! Wrap any `DocumentStoreClient` / `BlobStore`, count every call by
//! operation, and inject failures on demand. Used to verify that
//! validation happens before any store call and to drive the
//! compensation paths of the batch tier.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use annostore_core::{
    BlobHandle, BlobStore, Document, DocumentStoreClient, Error, ObjectId, Result, Selector,
};

/// Injected behaviour for `insert_many` on one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertFault {
    /// Fail the whole call with `BackendFailure`
    Fail,
    /// Store only the first `n` documents and report only their ids
    Truncate(usize),
}

/// Snapshot of per-operation call counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentCalls {
    /// `insert_many` / `insert_one` calls
    pub insert: usize,
    /// `find_one` calls
    pub find_one: usize,
    /// `find_many` calls
    pub find_many: usize,
    /// `replace_one` calls
    pub replace: usize,
    /// `delete_many` calls
    pub delete: usize,
}

impl DocumentCalls {
    /// Sum over every operation
    pub fn total(&self) -> usize {
        self.insert + self.find_one + self.find_many + self.replace + self.delete
    }
}

/// Document store wrapper that counts calls and injects faults
#[derive(Debug, Default)]
pub struct InstrumentedDocumentStore<S> {
    inner: S,
    insert: AtomicUsize,
    find_one: AtomicUsize,
    find_many: AtomicUsize,
    replace: AtomicUsize,
    delete: AtomicUsize,
    insert_faults: Mutex<HashMap<String, InsertFault>>,
}

impl<S: DocumentStoreClient> InstrumentedDocumentStore<S> {
    /// Wrap a store
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            insert: AtomicUsize::new(0),
            find_one: AtomicUsize::new(0),
            find_many: AtomicUsize::new(0),
            replace: AtomicUsize::new(0),
            delete: AtomicUsize::new(0),
            insert_faults: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Current call counts
    pub fn calls(&self) -> DocumentCalls {
        DocumentCalls {
            insert: self.insert.load(Ordering::SeqCst),
            find_one: self.find_one.load(Ordering::SeqCst),
            find_many: self.find_many.load(Ordering::SeqCst),
            replace: self.replace.load(Ordering::SeqCst),
            delete: self.delete.load(Ordering::SeqCst),
        }
    }

    /// Apply `fault` to every subsequent insert into `collection`
    pub fn set_insert_fault(&self, collection: &str, fault: InsertFault) {
        self.insert_faults.lock().insert(collection.to_string(), fault);
    }

    /// Remove every injected fault
    pub fn clear_faults(&self) {
        self.insert_faults.lock().clear();
    }
}

impl<S: DocumentStoreClient> DocumentStoreClient for InstrumentedDocumentStore<S> {
    fn connect(&self) -> Result<()> {
        self.inner.connect()
    }

    fn disconnect(&self) {
        self.inner.disconnect()
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    fn insert_many(&self, collection: &str, mut docs: Vec<Document>) -> Result<Vec<ObjectId>> {
        self.insert.fetch_add(1, Ordering::SeqCst);
        let fault = self.insert_faults.lock().get(collection).copied();
        match fault {
            Some(InsertFault::Fail) => Err(Error::BackendFailure(format!(
                "injected insert failure on {collection}"
            ))),
            Some(InsertFault::Truncate(n)) => {
                docs.truncate(n);
                self.inner.insert_many(collection, docs)
            }
            None => self.inner.insert_many(collection, docs),
        }
    }

    fn find_one(&self, collection: &str, selector: &Selector) -> Result<Option<Document>> {
        self.find_one.fetch_add(1, Ordering::SeqCst);
        self.inner.find_one(collection, selector)
    }

    fn find_many(&self, collection: &str, selector: &Selector) -> Result<Vec<Document>> {
        self.find_many.fetch_add(1, Ordering::SeqCst);
        self.inner.find_many(collection, selector)
    }

    fn replace_one(&self, collection: &str, id: &ObjectId, doc: Document) -> Result<bool> {
        self.replace.fetch_add(1, Ordering::SeqCst);
        self.inner.replace_one(collection, id, doc)
    }

    fn delete_many(&self, collection: &str, selector: &Selector) -> Result<usize> {
        self.delete.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_many(collection, selector)
    }
}

/// Snapshot of per-operation blob call counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlobCalls {
    /// `put` calls
    pub put: usize,
    /// `get` calls
    pub get: usize,
    /// `exists` calls
    pub exists: usize,
    /// `delete` calls
    pub delete: usize,
}

impl BlobCalls {
    /// Sum over every operation
    pub fn total(&self) -> usize {
        self.put + self.get + self.exists + self.delete
    }
}

/// Blob store wrapper that counts calls and injects faults
#[derive(Debug, Default)]
pub struct InstrumentedBlobStore<B> {
    inner: B,
    put: AtomicUsize,
    get: AtomicUsize,
    exists: AtomicUsize,
    delete: AtomicUsize,
    fail_puts: Mutex<bool>,
    fail_deletes: Mutex<bool>,
}

impl<B: BlobStore> InstrumentedBlobStore<B> {
    /// Wrap a blob store
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            put: AtomicUsize::new(0),
            get: AtomicUsize::new(0),
            exists: AtomicUsize::new(0),
            delete: AtomicUsize::new(0),
            fail_puts: Mutex::new(false),
            fail_deletes: Mutex::new(false),
        }
    }

    /// The wrapped store
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Current call counts
    pub fn calls(&self) -> BlobCalls {
        BlobCalls {
            put: self.put.load(Ordering::SeqCst),
            get: self.get.load(Ordering::SeqCst),
            exists: self.exists.load(Ordering::SeqCst),
            delete: self.delete.load(Ordering::SeqCst),
        }
    }

    /// Make every subsequent `put` fail
    pub fn set_fail_puts(&self, fail: bool) {
        *self.fail_puts.lock() = fail;
    }

    /// Make every subsequent `delete` fail
    pub fn set_fail_deletes(&self, fail: bool) {
        *self.fail_deletes.lock() = fail;
    }
}

impl<B: BlobStore> BlobStore for InstrumentedBlobStore<B> {
    fn put(&self, bytes: &[u8]) -> Result<BlobHandle> {
        self.put.fetch_add(1, Ordering::SeqCst);
        if *self.fail_puts.lock() {
            return Err(Error::BackendFailure("injected blob put failure".to_string()));
        }
        self.inner.put(bytes)
    }

    fn get(&self, handle: &BlobHandle) -> Result<Vec<u8>> {
        self.get.fetch_add(1, Ordering::SeqCst);
        self.inner.get(handle)
    }

    fn exists(&self, handle: &BlobHandle) -> Result<bool> {
        self.exists.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(handle)
    }

    fn delete(&self, handle: &BlobHandle) -> Result<()> {
        self.delete.fetch_add(1, Ordering::SeqCst);
        if *self.fail_deletes.lock() {
            return Err(Error::BackendFailure(format!(
                "injected blob delete failure for {handle}"
            )));
        }
        self.inner.delete(handle)
    }

    fn handles(&self) -> Result<Vec<BlobHandle>> {
        self.inner.handles()
    }
}
