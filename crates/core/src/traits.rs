//! Core traits for the external collaborators
//!
//! This module defines the DocumentStoreClient and BlobStore traits the
//! engine builds on. Implementations can be swapped (in-memory, filesystem,
//! a networked document database) without touching the engine.
//!
//! Thread safety: all methods must be safe to call concurrently from
//! multiple threads (requires Send + Sync). Implementations serialize
//! individual writes; nothing here offers multi-call transactions.

use crate::error::{Error, Result};
use crate::selector::Selector;
use crate::types::{BlobHandle, Document, ObjectId};

/// Generic document CRUD over named collections
///
/// Stored documents carry their store-assigned id under `_id` as a hex
/// string. Every operation on a disconnected client fails with
/// `Error::NotConnected`.
pub trait DocumentStoreClient: Send + Sync {
    /// Establish the connection
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn connect(&self) -> Result<()>;

    /// Drop the connection; subsequent calls fail with `NotConnected`
    fn disconnect(&self);

    /// True once `connect` has succeeded and until `disconnect`
    fn is_connected(&self) -> bool;

    /// Insert documents, assigning each a fresh id
    ///
    /// Any `_id` on the incoming documents is replaced. Returns the ids
    /// that were actually assigned, in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<ObjectId>>;

    /// Insert a single document
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn insert_one(&self, collection: &str, doc: Document) -> Result<ObjectId> {
        self.insert_many(collection, vec![doc])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::BackendFailure("insert returned no id".to_string()))
    }

    /// First document matching the selector, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the selector is invalid or the storage operation fails.
    fn find_one(&self, collection: &str, selector: &Selector) -> Result<Option<Document>>;

    /// All documents matching the selector, in store iteration order
    ///
    /// # Errors
    ///
    /// Returns an error if the selector is invalid or the storage operation fails.
    fn find_many(&self, collection: &str, selector: &Selector) -> Result<Vec<Document>>;

    /// Replace the document stored under `id`
    ///
    /// Returns false if no document has that id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn replace_one(&self, collection: &str, id: &ObjectId, doc: Document) -> Result<bool>;

    /// Delete every document matching the selector; returns the count removed
    ///
    /// # Errors
    ///
    /// Returns an error if the selector is invalid or the storage operation fails.
    fn delete_many(&self, collection: &str, selector: &Selector) -> Result<usize>;
}

/// Storage for opaque byte payloads addressed by handle
pub trait BlobStore: Send + Sync {
    /// Store a payload; returns the handle assigned to it
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be written.
    fn put(&self, bytes: &[u8]) -> Result<BlobHandle>;

    /// Fetch a payload
    ///
    /// # Errors
    ///
    /// Returns `Error::BlobNotFound` if the handle does not resolve.
    fn get(&self, handle: &BlobHandle) -> Result<Vec<u8>>;

    /// True if the handle resolves to a stored payload
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be queried.
    fn exists(&self, handle: &BlobHandle) -> Result<bool>;

    /// Remove a payload; removing an absent handle is not an error
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to delete an existing payload.
    fn delete(&self, handle: &BlobHandle) -> Result<()>;

    /// Every handle currently stored
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be enumerated.
    fn handles(&self) -> Result<Vec<BlobHandle>>;
}
