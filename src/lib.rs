//! annostore - dual-tier annotation storage
//!
//! Annotations attached to a parent document are stored in one of two tiers:
//!
//! - **Record tier**: one stored record per annotation, for small sets that
//!   are edited individually.
//! - **Batch tier**: one serialized blob per batch plus one metadata record
//!   holding the fields every element shares, for large write-once sets.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use annostore::{
//!     AnnotationEngine, BatchFormat, BatchInput, EngineConfig, InMemoryBlobStore,
//!     InMemoryDocumentStore, ObjectId, Selector, StorageScope,
//! };
//!
//! let engine = AnnotationEngine::from_config(
//!     Arc::new(InMemoryDocumentStore::connected()),
//!     Arc::new(InMemoryBlobStore::new()),
//!     &EngineConfig::default(),
//! )?;
//!
//! let doc = ObjectId::new().to_hex();
//! let input = BatchInput::from_json(serde_json::json!({
//!     "common": {"@context": "ner"},
//!     "data": [{"start": 0, "end": 4}, {"start": 9, "end": 12}]
//! }))?;
//! engine.create_annotations(&doc, input, BatchFormat::Compact, StorageScope::Batch)?;
//!
//! let set = engine.get_annotations(&[&doc], &Selector::new(), BatchFormat::Basic, StorageScope::All)?;
//! assert_eq!(set.len(), 2);
//! ```
//!
//! # Architecture
//!
//! All operations go through [`AnnotationEngine`]. The document store and
//! blob store it runs on are reached through the [`DocumentStoreClient`] and
//! [`BlobStore`] traits; [`annostore_storage`] provides in-memory and
//! filesystem implementations.

pub use annostore_core::*;
pub use annostore_engine::*;
pub use annostore_storage::{testing, FsBlobStore, InMemoryBlobStore, InMemoryDocumentStore};
