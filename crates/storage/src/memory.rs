//! InMemoryDocumentStore: reference DocumentStoreClient
//!
//! Collections are ordered maps keyed by `ObjectId`, so iteration order is
//! insertion order for ids generated by this process.
//!
//! # Design Notes
//!
//! - **One write lock per call**: `insert_many` and `delete_many` apply
//!   all of their changes under a single write lock, so concurrent readers
//!   observe either none or all of a bulk call.
//! - **Explicit connection state**: the store starts disconnected and every
//!   operation before `connect` fails with `NotConnected`, as a networked
//!   client would.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use annostore_core::{
    Document, DocumentStoreClient, Error, ObjectId, Result, Selector, STORE_ID_FIELD,
};

type Collection = BTreeMap<ObjectId, Document>;

/// Document store held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    /// Collection name → documents keyed by id
    collections: RwLock<HashMap<String, Collection>>,
    /// Set by `connect`, cleared by `disconnect`
    connected: AtomicBool,
}

impl InMemoryDocumentStore {
    /// Create a new, disconnected store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that is already connected
    pub fn connected() -> Self {
        let store = Self::new();
        store.connected.store(true, Ordering::SeqCst);
        store
    }

    /// Number of documents in a collection (0 if the collection is unknown)
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Names of collections that currently hold at least one document
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .read()
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }
}

fn with_id(mut doc: Document, id: &ObjectId) -> Document {
    doc.insert(STORE_ID_FIELD.to_string(), Value::String(id.to_string()));
    doc
}

impl DocumentStoreClient for InMemoryDocumentStore {
    fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        debug!(target: "annostore::storage", "In-memory document store connected");
        Ok(())
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<ObjectId>> {
        self.ensure_connected()?;

        let mut guard = self.collections.write();
        let target = guard.entry(collection.to_string()).or_default();
        let mut ids = Vec::with_capacity(docs.len());
        for doc in docs {
            let id = ObjectId::new();
            target.insert(id, with_id(doc, &id));
            ids.push(id);
        }
        debug!(target: "annostore::storage", collection, inserted = ids.len(), "Inserted documents");
        Ok(ids)
    }

    fn find_one(&self, collection: &str, selector: &Selector) -> Result<Option<Document>> {
        self.ensure_connected()?;
        selector.validate()?;

        let guard = self.collections.read();
        let Some(docs) = guard.get(collection) else {
            return Ok(None);
        };
        for doc in docs.values() {
            if selector.matches(doc)? {
                return Ok(Some(doc.clone()));
            }
        }
        Ok(None)
    }

    fn find_many(&self, collection: &str, selector: &Selector) -> Result<Vec<Document>> {
        self.ensure_connected()?;
        selector.validate()?;

        let guard = self.collections.read();
        let Some(docs) = guard.get(collection) else {
            return Ok(Vec::new());
        };
        let mut found = Vec::new();
        for doc in docs.values() {
            if selector.matches(doc)? {
                found.push(doc.clone());
            }
        }
        Ok(found)
    }

    fn replace_one(&self, collection: &str, id: &ObjectId, doc: Document) -> Result<bool> {
        self.ensure_connected()?;

        let mut guard = self.collections.write();
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(false);
        };
        if !docs.contains_key(id) {
            return Ok(false);
        }
        docs.insert(*id, with_id(doc, id));
        Ok(true)
    }

    fn delete_many(&self, collection: &str, selector: &Selector) -> Result<usize> {
        self.ensure_connected()?;
        selector.validate()?;

        let mut guard = self.collections.write();
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(0);
        };
        let mut doomed = Vec::new();
        for (id, doc) in docs.iter() {
            if selector.matches(doc)? {
                doomed.push(*id);
            }
        }
        for id in &doomed {
            docs.remove(id);
        }
        debug!(target: "annostore::storage", collection, deleted = doomed.len(), "Deleted documents");
        Ok(doomed.len())
    }
}
