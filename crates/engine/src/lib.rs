//! Annotation engine
//!
//! This crate orchestrates the two storage tiers:
//! - AnnotationEngine: validation, shaping and routing of every operation
//! - RecordTierStore: one stored record per annotation
//! - BatchTierStore / BlobSaga: one blob plus one metadata record per batch
//! - factor_common: derivation of the fields shared by a batch
//! - EngineConfig: collection bindings loaded from `annostore.toml`
//! - Orphaned-blob sweep for out-of-band reconciliation
//!
//! The engine is the only component that knows about both tiers. The
//! stores beneath it are reached through the `annostore-core` traits.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch_tier;
pub mod config;
pub mod engine;
pub mod factoring;
pub mod record_tier;
mod sweep;

pub use batch_tier::{BatchTierStore, BlobSaga};
pub use config::{
    BlobConfig, CollectionsConfig, EngineConfig, StorageCollections, CONFIG_FILE_NAME,
};
pub use engine::AnnotationEngine;
pub use factoring::{factor_common, FactoredBatch};
pub use record_tier::RecordTierStore;
