//! AnnotationEngine: the public entry point
//!
//! Validates requests, shapes documents, and routes them to the record
//! tier (one stored record per annotation) or the batch tier (one blob plus
//! one metadata record per batch).
//!
//! Every operation is synchronous and issues its store calls one after
//! another. Validation always completes before the first store call, so a
//! rejected request leaves no state behind.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use annostore_core::{
    is_valid_id, validate_document_id_list, AnnotationSet, BatchFormat, BatchInput, BlobStore,
    Document, DocumentStoreClient, Error, ObjectId, Result, Selector, StorageScope,
    BLOB_HANDLE_FIELD, CONTEXT_FIELD, DOC_ID_FIELD, PUBLIC_ID_FIELD, STORE_ID_FIELD,
};

use crate::batch_tier::{BatchTierStore, BlobSaga};
use crate::config::{EngineConfig, StorageCollections};
use crate::factoring::factor_common;
use crate::record_tier::RecordTierStore;

/// Elements that passed the validation gate, ready to persist
struct PreparedBatch {
    elements: Vec<Document>,
    /// Caller's common fields (compact format only)
    common: Option<Document>,
}

/// Dual-tier annotation engine
#[derive(Clone)]
pub struct AnnotationEngine {
    docs: Arc<dyn DocumentStoreClient>,
    blobs: Arc<dyn BlobStore>,
    collections: StorageCollections,
}

impl AnnotationEngine {
    /// Create an engine over the given stores and collection bindings
    pub fn new(
        docs: Arc<dyn DocumentStoreClient>,
        blobs: Arc<dyn BlobStore>,
        collections: StorageCollections,
    ) -> Self {
        Self {
            docs,
            blobs,
            collections,
        }
    }

    /// Create an engine with collection bindings taken from a config
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the config fails validation.
    pub fn from_config(
        docs: Arc<dyn DocumentStoreClient>,
        blobs: Arc<dyn BlobStore>,
        config: &EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(docs, blobs, config.storage_collections()))
    }

    /// Collection bindings in use
    pub fn collections(&self) -> &StorageCollections {
        &self.collections
    }

    // ========================================================================
    // Connection lifecycle
    // ========================================================================

    /// Connect the document store client
    pub fn connect(&self) -> Result<()> {
        self.docs.connect().map_err(|e| backend("connect", e))?;
        info!(target: "annostore::engine", "Document store connected");
        Ok(())
    }

    /// Disconnect the document store client
    pub fn disconnect(&self) {
        self.docs.disconnect();
        info!(target: "annostore::engine", "Document store disconnected");
    }

    /// True while the document store client is connected
    pub fn is_connected(&self) -> bool {
        self.docs.is_connected()
    }

    // ========================================================================
    // Batch operations
    // ========================================================================

    /// Store a batch of annotations for one document
    ///
    /// Returns the number of annotations created. A batch with no element
    /// sequence, or an empty one, creates nothing and returns 0.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentifier` if `document_id` is malformed
    /// - `UnsupportedStorageScope` for `StorageScope::All`
    /// - `StorageNotConfigured` if the target tier has no collection
    /// - `MissingRequiredField` if any element lacks `@context`; nothing is stored
    /// - `InsertCountMismatch` if the record tier stored fewer records than sent
    /// - `NotConnected` if the document store is disconnected; no blob is written
    /// - `BackendFailure` for store failures (the batch blob is compensated)
    pub fn create_annotations(
        &self,
        document_id: &str,
        input: BatchInput,
        format: BatchFormat,
        scope: StorageScope,
    ) -> Result<usize> {
        check_document_id(document_id)?;
        if scope == StorageScope::All {
            info!(target: "annostore::engine", %document_id, "Rejected create targeting both tiers");
            return Err(Error::UnsupportedStorageScope(scope.to_string()));
        }
        self.collections.require(scope)?;

        let Some(prepared) = prepare_batch(document_id, input, format)? else {
            debug!(target: "annostore::engine", %document_id, "Empty batch, nothing to create");
            return Ok(0);
        };

        match scope {
            StorageScope::Record => self.persist_records(document_id, prepared.elements),
            _ => self.persist_batch(document_id, prepared),
        }
    }

    /// Read annotations of the given documents
    ///
    /// The selector is conjoined with `doc_id ∈ document_ids`. In the batch
    /// tier it applies to metadata records, and every matching batch
    /// contributes all of its elements. An empty or malformed id list
    /// yields an empty set.
    ///
    /// # Errors
    ///
    /// `StorageNotConfigured`, `InvalidSelector`, `NotConnected`, or
    /// `BackendFailure`.
    pub fn get_annotations<S: AsRef<str>>(
        &self,
        document_ids: &[S],
        selector: &Selector,
        format: BatchFormat,
        scope: StorageScope,
    ) -> Result<AnnotationSet> {
        if let Err(e) = validate_document_id_list(document_ids) {
            debug!(target: "annostore::engine", error = %e, "Unusable document id list, returning no annotations");
            return Ok(AnnotationSet::empty());
        }
        self.collections.require(scope)?;
        selector.validate()?;
        let scoped = selector.scoped_to(document_ids);

        let mut data: Vec<Value> = Vec::new();
        if scope.includes_record() {
            let records = self
                .record_tier()?
                .find_many(&scoped)
                .map_err(|e| backend("find records", e))?;
            debug!(target: "annostore::record", count = records.len(), "Loaded record-tier annotations");
            data.extend(records.into_iter().map(|r| Value::Object(publish_id(r))));
        }
        if scope.includes_batch() {
            let tier = self.batch_tier()?;
            let metadata = tier
                .find_many(&scoped)
                .map_err(|e| backend("find batches", e))?;
            debug!(target: "annostore::batch", batches = metadata.len(), "Loaded batch metadata");
            for record in &metadata {
                if let Some(elements) = tier
                    .load_elements(record)
                    .map_err(|e| backend("load batch", e))?
                {
                    data.extend(elements);
                }
            }
        }

        Ok(match format {
            BatchFormat::Basic => AnnotationSet { common: None, data },
            BatchFormat::Compact => compact(data),
        })
    }

    /// Delete annotations of the given documents
    ///
    /// Record tier: returns the number of records removed. Batch tier:
    /// returns the number of batches removed, which undercounts elements.
    /// Blob deletion is best-effort; failures are logged and never abort
    /// the operation.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentifier` if any id is malformed (an empty list returns 0)
    /// - `StorageNotConfigured`, `InvalidSelector`, `NotConnected`, `BackendFailure`
    pub fn delete_annotations<S: AsRef<str>>(
        &self,
        document_ids: &[S],
        selector: &Selector,
        scope: StorageScope,
    ) -> Result<usize> {
        if document_ids.is_empty() {
            return Ok(0);
        }
        if let Err(e) = validate_document_id_list(document_ids) {
            info!(target: "annostore::engine", error = %e, "Rejected delete");
            return Err(e);
        }
        self.collections.require(scope)?;
        selector.validate()?;
        let scoped = selector.scoped_to(document_ids);

        let mut deleted = 0;
        if scope.includes_record() {
            let removed = self
                .record_tier()?
                .delete_many(&scoped)
                .map_err(|e| backend("delete records", e))?;
            debug!(target: "annostore::record", removed, "Deleted record-tier annotations");
            deleted += removed;
        }
        if scope.includes_batch() {
            deleted += self.delete_batches(&scoped)?;
        }
        Ok(deleted)
    }

    /// Replace the batches of a document
    ///
    /// Deletes the document's batches whose metadata matches every field of
    /// the input's `common` (all batches if there is none, or the format is
    /// basic), then creates the new batch. The new batch is validated before
    /// anything is deleted. The delete and the create are not atomic.
    ///
    /// # Errors
    ///
    /// As for `delete_annotations` and `create_annotations` on the batch tier.
    pub fn replace_batch(
        &self,
        document_id: &str,
        input: BatchInput,
        format: BatchFormat,
    ) -> Result<usize> {
        check_document_id(document_id)?;
        self.collections.require(StorageScope::Batch)?;

        let selector = match (format, &input.common) {
            (BatchFormat::Compact, Some(common)) => replacement_selector(common),
            _ => Selector::new(),
        };
        let prepared = prepare_batch(document_id, input, format)?;

        let removed = self.delete_annotations(&[document_id], &selector, StorageScope::Batch)?;
        debug!(target: "annostore::batch", %document_id, removed, "Removed batches being replaced");

        match prepared {
            Some(prepared) => self.persist_batch(document_id, prepared),
            None => Ok(0),
        }
    }

    // ========================================================================
    // Single annotations (record tier)
    // ========================================================================

    /// Store one annotation in the record tier; returns its id
    ///
    /// # Errors
    ///
    /// `InvalidIdentifier`, `StorageNotConfigured`, `MissingRequiredField`,
    /// `NotConnected`, or `BackendFailure`.
    pub fn create_annotation(&self, document_id: &str, annotation: Value) -> Result<ObjectId> {
        check_document_id(document_id)?;
        let tier = self.record_tier()?;
        let element = prepare_element(document_id, 0, annotation, None)?;
        let id = tier
            .insert_one(element)
            .map_err(|e| backend("insert record", e))?;
        debug!(target: "annostore::record", %id, %document_id, "Created annotation");
        Ok(id)
    }

    /// Fetch one record-tier annotation; a malformed id finds nothing
    pub fn get_annotation(&self, annotation_id: &str) -> Result<Option<Document>> {
        let Some(id) = ObjectId::parse(annotation_id) else {
            return Ok(None);
        };
        let found = self
            .record_tier()?
            .find_by_id(&id)
            .map_err(|e| backend("find record", e))?;
        Ok(found.map(publish_id))
    }

    /// Replace one record-tier annotation wholesale
    ///
    /// # Errors
    ///
    /// `InvalidIdentifier` for a malformed id, `AnnotationNotFound` if no
    /// annotation has that id, plus the errors of `create_annotation`.
    pub fn update_annotation(
        &self,
        annotation_id: &str,
        document_id: &str,
        annotation: Value,
    ) -> Result<ObjectId> {
        let id = ObjectId::parse(annotation_id)
            .ok_or_else(|| Error::InvalidIdentifier(annotation_id.to_string()))?;
        check_document_id(document_id)?;
        let tier = self.record_tier()?;
        let element = prepare_element(document_id, 0, annotation, None)?;

        let replaced = tier
            .replace(&id, element)
            .map_err(|e| backend("replace record", e))?;
        if !replaced {
            return Err(Error::AnnotationNotFound(annotation_id.to_string()));
        }
        debug!(target: "annostore::record", %id, "Updated annotation");
        Ok(id)
    }

    /// Delete one record-tier annotation; returns 0 or 1
    pub fn delete_annotation(&self, annotation_id: &str) -> Result<usize> {
        let Some(id) = ObjectId::parse(annotation_id) else {
            return Ok(0);
        };
        self.record_tier()?
            .delete_many(&Selector::new().eq(STORE_ID_FIELD, id.to_string()))
            .map_err(|e| backend("delete record", e))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    pub(crate) fn record_tier(&self) -> Result<RecordTierStore> {
        let collection = self.collections.collection(StorageScope::Record)?;
        Ok(RecordTierStore::new(self.docs.clone(), collection))
    }

    pub(crate) fn batch_tier(&self) -> Result<BatchTierStore> {
        let collection = self.collections.collection(StorageScope::Batch)?;
        Ok(BatchTierStore::new(
            self.docs.clone(),
            self.blobs.clone(),
            collection,
        ))
    }

    fn persist_records(&self, document_id: &str, elements: Vec<Document>) -> Result<usize> {
        let expected = elements.len();
        let ids = self
            .record_tier()?
            .insert_many(elements)
            .map_err(|e| backend("insert records", e))?;
        if ids.len() != expected {
            // already-inserted records stay in place
            error!(target: "annostore::record", %document_id, inserted = ids.len(), expected, "Record insert count mismatch");
            return Err(Error::InsertCountMismatch {
                inserted: ids.len(),
                expected,
            });
        }
        debug!(target: "annostore::record", %document_id, count = expected, "Created record-tier annotations");
        Ok(expected)
    }

    fn persist_batch(&self, document_id: &str, prepared: PreparedBatch) -> Result<usize> {
        let tier = self.batch_tier()?;
        if !self.docs.is_connected() {
            warn!(target: "annostore::batch", %document_id, "Document store not connected, no blob written");
            return Err(Error::NotConnected);
        }
        let PreparedBatch {
            mut elements,
            common,
        } = prepared;

        let factored = factor_common(&elements);
        for element in &mut elements {
            element.insert(
                PUBLIC_ID_FIELD.to_string(),
                Value::String(ObjectId::new().to_hex()),
            );
        }
        let count = elements.len();
        let payload = serde_json::to_vec(&elements)?;

        let mut metadata = factored.common;
        if let Some(common) = common {
            metadata.extend(common);
        }
        for field in [STORE_ID_FIELD, PUBLIC_ID_FIELD, BLOB_HANDLE_FIELD] {
            metadata.remove(field);
        }
        metadata.insert(
            DOC_ID_FIELD.to_string(),
            Value::String(document_id.to_string()),
        );

        let saga = BlobSaga::begin(&tier, &payload).map_err(|e| backend("write batch blob", e))?;
        let handle = saga.handle();
        let metadata_id = saga.commit(metadata)?;
        debug!(target: "annostore::batch", %document_id, %metadata_id, %handle, count, "Created batch");
        Ok(count)
    }

    fn delete_batches(&self, selector: &Selector) -> Result<usize> {
        let tier = self.batch_tier()?;
        let metadata = tier
            .find_many(selector)
            .map_err(|e| backend("find batches", e))?;
        if metadata.is_empty() {
            return Ok(0);
        }

        let mut blobs_removed = 0;
        let mut ids = Vec::with_capacity(metadata.len());
        for record in &metadata {
            if tier.discard_blob(record) {
                blobs_removed += 1;
            }
            match record.get(STORE_ID_FIELD).and_then(Value::as_str) {
                Some(id) => ids.push(id.to_string()),
                None => warn!(target: "annostore::batch", "Batch metadata record without a store id"),
            }
        }

        let removed = tier
            .delete_many(&Selector::ids_in(STORE_ID_FIELD, ids))
            .map_err(|e| backend("delete batches", e))?;
        debug!(target: "annostore::batch", removed, blobs_removed, "Deleted batches");
        Ok(removed)
    }
}

// ============================================================================
// Request shaping
// ============================================================================

fn check_document_id(document_id: &str) -> Result<()> {
    if is_valid_id(document_id) {
        Ok(())
    } else {
        info!(target: "annostore::engine", %document_id, "Rejected malformed document id");
        Err(Error::InvalidIdentifier(document_id.to_string()))
    }
}

/// Run the validation gate over a whole batch
///
/// Returns None if there is nothing to create. Either every element
/// passes or the batch is rejected as a whole.
fn prepare_batch(
    document_id: &str,
    input: BatchInput,
    format: BatchFormat,
) -> Result<Option<PreparedBatch>> {
    let data = match input.data {
        Some(data) if !data.is_empty() => data,
        _ => return Ok(None),
    };
    let common = match format {
        BatchFormat::Compact => input.common,
        BatchFormat::Basic => None,
    };

    let elements = data
        .into_iter()
        .enumerate()
        .map(|(index, value)| prepare_element(document_id, index, value, common.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(PreparedBatch { elements, common }))
}

/// Overlay common fields, strip client ids, check `@context`, set `doc_id`
fn prepare_element(
    document_id: &str,
    index: usize,
    value: Value,
    common: Option<&Document>,
) -> Result<Document> {
    let missing = || {
        info!(target: "annostore::engine", %document_id, index, "Rejected batch: element missing @context");
        Error::MissingRequiredField {
            index,
            document_id: document_id.to_string(),
        }
    };

    let Value::Object(mut element) = value else {
        return Err(missing());
    };
    if let Some(common) = common {
        element.extend(common.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    element.remove(STORE_ID_FIELD);
    element.remove(PUBLIC_ID_FIELD);
    if !element.contains_key(CONTEXT_FIELD) {
        return Err(missing());
    }
    element.insert(
        DOC_ID_FIELD.to_string(),
        Value::String(document_id.to_string()),
    );
    Ok(element)
}

/// Selector picking the batches a replacement supersedes
fn replacement_selector(common: &Document) -> Selector {
    common
        .iter()
        .filter(|(field, _)| field.as_str() != STORE_ID_FIELD && field.as_str() != PUBLIC_ID_FIELD)
        .fold(Selector::new(), |selector, (field, value)| {
            selector.with(field.clone(), json!({ "$eq": value }))
        })
}

/// Expose the store id under the public id field
fn publish_id(mut record: Document) -> Document {
    if let Some(id) = record.remove(STORE_ID_FIELD) {
        record.insert(PUBLIC_ID_FIELD.to_string(), id);
    }
    record
}

fn compact(data: Vec<Value>) -> AnnotationSet {
    let elements: Vec<Document> = data
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();
    let mut factored = factor_common(&elements);
    // ids stay with their element even when only one element is returned
    if let Some(id) = factored.common.remove(PUBLIC_ID_FIELD) {
        for residual in &mut factored.residuals {
            residual.insert(PUBLIC_ID_FIELD.to_string(), id.clone());
        }
    }
    AnnotationSet {
        common: (!factored.common.is_empty()).then_some(factored.common),
        data: factored.residuals.into_iter().map(Value::Object).collect(),
    }
}

fn backend(operation: &'static str, e: Error) -> Error {
    error!(target: "annostore::engine", operation, error = %e, "Store call failed");
    e.into_backend()
}
