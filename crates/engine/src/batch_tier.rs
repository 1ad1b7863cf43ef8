//! BatchTierStore: batches stored as one blob plus one metadata record
//!
//! ## Write path: BlobSaga
//!
//! Creating a batch takes two writes with no coordinator between them:
//!
//! 1. `BlobSaga::begin` writes the serialized elements to the blob store
//!    and holds the resulting handle.
//! 2. `BlobSaga::commit` writes the metadata record referencing that
//!    handle. If the write fails, `compensate` deletes the blob. A lost
//!    connection surfaces as `NotConnected`, anything else as
//!    `BackendFailure`.
//!
//! A crash between the two steps leaves an unreferenced blob behind.
//! Nothing here heals that; see `AnnotationEngine::sweep_orphaned_blobs`.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use annostore_core::{
    BlobHandle, BlobStore, Document, DocumentStoreClient, Error, ObjectId, Result, Selector,
    BLOB_HANDLE_FIELD,
};

/// Batch-tier adapter: metadata collection plus blob store
#[derive(Clone)]
pub struct BatchTierStore {
    docs: Arc<dyn DocumentStoreClient>,
    blobs: Arc<dyn BlobStore>,
    collection: String,
}

impl BatchTierStore {
    /// Route metadata to `collection` and payloads to `blobs`
    pub fn new(
        docs: Arc<dyn DocumentStoreClient>,
        blobs: Arc<dyn BlobStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            docs,
            blobs,
            collection: collection.into(),
        }
    }

    /// Metadata collection this adapter writes to
    pub fn collection(&self) -> &str {
        &self.collection
    }

    // ========================================================================
    // Metadata records
    // ========================================================================

    /// Insert metadata records; returns the ids actually assigned
    pub fn insert_many(&self, records: Vec<Document>) -> Result<Vec<ObjectId>> {
        self.docs.insert_many(&self.collection, records)
    }

    /// Metadata records matching the selector
    pub fn find_many(&self, selector: &Selector) -> Result<Vec<Document>> {
        self.docs.find_many(&self.collection, selector)
    }

    /// Delete metadata records matching the selector; returns the count removed
    pub fn delete_many(&self, selector: &Selector) -> Result<usize> {
        self.docs.delete_many(&self.collection, selector)
    }

    // ========================================================================
    // Blobs
    // ========================================================================

    /// Store a payload
    pub fn put_blob(&self, bytes: &[u8]) -> Result<BlobHandle> {
        self.blobs.put(bytes)
    }

    /// Fetch a payload
    pub fn get_blob(&self, handle: &BlobHandle) -> Result<Vec<u8>> {
        self.blobs.get(handle)
    }

    /// True if the handle resolves
    pub fn blob_exists(&self, handle: &BlobHandle) -> Result<bool> {
        self.blobs.exists(handle)
    }

    /// Remove a payload
    pub fn delete_blob(&self, handle: &BlobHandle) -> Result<()> {
        self.blobs.delete(handle)
    }

    /// Every handle in the blob store
    pub fn blob_handles(&self) -> Result<Vec<BlobHandle>> {
        self.blobs.handles()
    }

    // ========================================================================
    // Batch-level helpers
    // ========================================================================

    /// Read the elements of the batch described by a metadata record
    ///
    /// Returns None if the record carries no usable handle or the handle no
    /// longer resolves; such a batch is treated as already deleted.
    pub fn load_elements(&self, metadata: &Document) -> Result<Option<Vec<Value>>> {
        let Some(handle) = blob_handle_of(metadata) else {
            warn!(target: "annostore::batch", "Batch metadata record without a valid blob handle, skipping");
            return Ok(None);
        };
        if !self.blob_exists(&handle)? {
            debug!(target: "annostore::batch", %handle, "Batch blob missing, skipping");
            return Ok(None);
        }
        let bytes = match self.get_blob(&handle) {
            Ok(bytes) => bytes,
            Err(Error::BlobNotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let elements: Vec<Value> = serde_json::from_slice(&bytes)?;
        Ok(Some(elements))
    }

    /// Best-effort removal of the blob behind a metadata record
    ///
    /// Returns true if a blob was found and removed. Failures are logged
    /// and reported as false; they never abort the caller.
    pub fn discard_blob(&self, metadata: &Document) -> bool {
        let Some(handle) = blob_handle_of(metadata) else {
            return false;
        };
        let outcome = self.blob_exists(&handle).and_then(|exists| {
            if exists {
                self.delete_blob(&handle).map(|_| true)
            } else {
                Ok(false)
            }
        });
        match outcome {
            Ok(removed) => removed,
            Err(e) => {
                warn!(target: "annostore::batch", %handle, error = %e, "Failed to delete batch blob");
                false
            }
        }
    }
}

/// Blob handle stored on a metadata record, if present and well-formed
pub fn blob_handle_of(metadata: &Document) -> Option<BlobHandle> {
    metadata
        .get(BLOB_HANDLE_FIELD)
        .and_then(Value::as_str)
        .and_then(BlobHandle::parse)
}

// ============================================================================
// BlobSaga
// ============================================================================

/// Blob-then-metadata write with an explicit compensation step
#[must_use = "a staged blob must be committed or compensated"]
pub struct BlobSaga<'a> {
    tier: &'a BatchTierStore,
    handle: BlobHandle,
}

impl<'a> BlobSaga<'a> {
    /// Step 1: write the payload
    pub fn begin(tier: &'a BatchTierStore, payload: &[u8]) -> Result<Self> {
        let handle = tier.put_blob(payload)?;
        debug!(target: "annostore::batch", %handle, bytes = payload.len(), "Staged batch blob");
        Ok(Self { tier, handle })
    }

    /// Handle of the staged blob
    pub fn handle(&self) -> BlobHandle {
        self.handle
    }

    /// Step 2: write the metadata record referencing the staged blob
    ///
    /// The blob-handle field is set on `metadata` here. On failure the blob
    /// is deleted and the error surfaces through `Error::into_backend`.
    pub fn commit(self, mut metadata: Document) -> Result<ObjectId> {
        metadata.insert(
            BLOB_HANDLE_FIELD.to_string(),
            Value::String(self.handle.to_string()),
        );
        let inserted = self
            .tier
            .insert_many(vec![metadata])
            .and_then(|ids| {
                ids.into_iter()
                    .next()
                    .ok_or_else(|| Error::BackendFailure("metadata insert returned no id".into()))
            });
        match inserted {
            Ok(id) => {
                debug!(target: "annostore::batch", %id, handle = %self.handle, "Committed batch metadata");
                Ok(id)
            }
            Err(e) => {
                error!(target: "annostore::batch", handle = %self.handle, error = %e, "Batch metadata insert failed, compensating");
                if let Err(cleanup) = self.compensate() {
                    warn!(target: "annostore::batch", error = %cleanup, "Compensating blob delete failed, blob is orphaned");
                }
                Err(e.into_backend())
            }
        }
    }

    /// Undo step 1 by deleting the staged blob
    pub fn compensate(self) -> Result<()> {
        self.tier.delete_blob(&self.handle)
    }
}
