//! Testing utilities for code built on the store traits
//!
//! - **Instrumented stores**: wrap any document or blob store, count calls
//!   per operation, and inject failures
//!
//! # Example
//!
//! ```ignore
//! use annostore_storage::testing::{InsertFault, InstrumentedDocumentStore};
//! use annostore_storage::InMemoryDocumentStore;
//!
//! let store = InstrumentedDocumentStore::new(InMemoryDocumentStore::connected());
//! store.set_insert_fault("batches", InsertFault::Fail);
//! // ... run the operation under test ...
//! assert_eq!(store.calls().total(), 1);
//! ```

mod instrumented;

pub use instrumented::{
    BlobCalls, DocumentCalls, InsertFault, InstrumentedBlobStore, InstrumentedDocumentStore,
};
