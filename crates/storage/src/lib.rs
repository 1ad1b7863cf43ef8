//! Storage layer for the annotation store
//!
//! This crate implements the external collaborator traits from
//! `annostore-core`:
//! - InMemoryDocumentStore: ordered per-collection maps behind a RwLock
//! - InMemoryBlobStore: handle → payload map behind a RwLock
//! - FsBlobStore: one file per payload under a namespace directory
//! - testing: call-counting, fault-injecting wrappers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blob;
pub mod memory;
pub mod testing;

pub use blob::{FsBlobStore, InMemoryBlobStore};
pub use memory::InMemoryDocumentStore;
