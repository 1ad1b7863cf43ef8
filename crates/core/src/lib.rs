//! Core types and traits for the annotation store
//!
//! This crate defines the foundational types used throughout the system:
//! - ObjectId / BlobHandle: identifiers for stored documents and blobs
//! - StorageScope / BatchFormat: closed enums selecting tiers and wire shapes
//! - BatchInput / AnnotationSet: submitted and returned annotation sets
//! - Selector: query documents with store-style operators
//! - Validation: identifier shape checks
//! - Error: error kinds shared by every layer
//! - Traits: DocumentStoreClient and BlobStore, the external collaborators

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod annotation;
pub mod error;
pub mod json;
pub mod selector;
pub mod traits;
pub mod types;
pub mod validation;

// Re-export commonly used types and traits
pub use annotation::{AnnotationSet, BatchFormat, BatchInput, StorageScope};
pub use error::{Error, Result};
pub use json::{get_at_path, json_cmp, json_eq};
pub use selector::Selector;
pub use traits::{BlobStore, DocumentStoreClient};
pub use types::{
    BlobHandle, Document, ObjectId, BLOB_HANDLE_FIELD, CONTEXT_FIELD, DOC_ID_FIELD,
    PUBLIC_ID_FIELD, RESERVED_SELECTOR_FIELDS, STORE_ID_FIELD,
};
pub use validation::{is_valid_id, validate_document_id_list};
