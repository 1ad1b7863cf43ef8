//! RecordTierStore: one stored record per annotation
//!
//! Thin adapter routing calls to the record collection. No business
//! logic lives here; the engine validates and shapes documents first.

use std::sync::Arc;

use annostore_core::{
    Document, DocumentStoreClient, ObjectId, Result, Selector, STORE_ID_FIELD,
};

/// Record-tier collection adapter
#[derive(Clone)]
pub struct RecordTierStore {
    docs: Arc<dyn DocumentStoreClient>,
    collection: String,
}

impl RecordTierStore {
    /// Route to `collection` on the given client
    pub fn new(docs: Arc<dyn DocumentStoreClient>, collection: impl Into<String>) -> Self {
        Self {
            docs,
            collection: collection.into(),
        }
    }

    /// Collection this adapter writes to
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Insert records in one bulk call; returns the ids actually assigned
    pub fn insert_many(&self, records: Vec<Document>) -> Result<Vec<ObjectId>> {
        self.docs.insert_many(&self.collection, records)
    }

    /// Insert a single record
    pub fn insert_one(&self, record: Document) -> Result<ObjectId> {
        self.docs.insert_one(&self.collection, record)
    }

    /// Records matching the selector
    pub fn find_many(&self, selector: &Selector) -> Result<Vec<Document>> {
        self.docs.find_many(&self.collection, selector)
    }

    /// Record stored under `id`
    pub fn find_by_id(&self, id: &ObjectId) -> Result<Option<Document>> {
        self.docs
            .find_one(&self.collection, &Selector::new().eq(STORE_ID_FIELD, id.to_string()))
    }

    /// Replace the record stored under `id`; false if there is none
    pub fn replace(&self, id: &ObjectId, record: Document) -> Result<bool> {
        self.docs.replace_one(&self.collection, id, record)
    }

    /// Delete records matching the selector; returns the count removed
    pub fn delete_many(&self, selector: &Selector) -> Result<usize> {
        self.docs.delete_many(&self.collection, selector)
    }
}
