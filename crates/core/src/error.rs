//! Error types for the annotation store
//!
//! This module defines all error kinds surfaced by the engine and the
//! store abstractions beneath it. We use `thiserror` for automatic
//! `Display` and `Error` trait implementations.
//!
//! Validation kinds (`InvalidIdentifier`, `UnsupportedStorageScope`,
//! `UnsupportedBatchFormat`, `StorageNotConfigured`, `MissingRequiredField`)
//! are always raised before any persistence call.

use std::io;
use thiserror::Error;

use crate::annotation::StorageScope;
use crate::types::BlobHandle;

/// Result type alias for annotation store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds for the annotation store
#[derive(Debug, Error)]
pub enum Error {
    /// An identifier does not match the store's unique-identifier format
    #[error("Invalid document id detected: {0}, operation aborted")]
    InvalidIdentifier(String),

    /// A storage scope outside the closed set, or `All` used as a write target
    #[error("Storage scope {0} is not supported")]
    UnsupportedStorageScope(String),

    /// A batch format outside the closed set
    #[error("Batch format {0} is not supported")]
    UnsupportedBatchFormat(String),

    /// The targeted tier has no collection bound to it
    #[error("Storage scope {0} is not configured")]
    StorageNotConfigured(StorageScope),

    /// An element of a batch lacks a required field (currently `@context`)
    #[error("Annotation {index} in batch is missing a required field for document {document_id}")]
    MissingRequiredField {
        /// Position of the offending element in the submitted batch
        index: usize,
        /// Document the batch was submitted for
        document_id: String,
    },

    /// A bulk record insert stored a different number of records than submitted
    #[error("Number of inserted annotations is not equal to the number of annotations in batch: {inserted} vs {expected}")]
    InsertCountMismatch {
        /// Records the store reported as inserted
        inserted: usize,
        /// Records submitted
        expected: usize,
    },

    /// The document store client is not connected
    #[error("Document store is not connected")]
    NotConnected,

    /// An annotation addressed by id does not exist
    #[error("Annotation with id {0} not found")]
    AnnotationNotFound(String),

    /// A blob handle does not resolve to a stored payload
    #[error("Blob {0} not found")]
    BlobNotFound(BlobHandle),

    /// A selector uses an unknown operator or a malformed operand
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Configuration file missing, unreadable or inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error from a filesystem-backed store
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Any unexpected lower-layer failure
    #[error("Backend failure: {0}")]
    BackendFailure(String),
}

impl Error {
    /// Fold an unexpected lower-layer error into `BackendFailure`
    ///
    /// `NotConnected`, `InvalidSelector` and an existing `BackendFailure`
    /// are caller-actionable and pass through unchanged.
    pub fn into_backend(self) -> Error {
        match self {
            Error::NotConnected | Error::InvalidSelector(_) | Error::BackendFailure(_) => self,
            other => Error::BackendFailure(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
